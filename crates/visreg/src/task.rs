//! Task dispatch between the host test context and the snapshot engine.
//!
//! Tasks are invoked by name with a JSON argument and answer with a JSON
//! result or an [`ErrorEnvelope`]. [`LocalTransport`] serves them in-process;
//! the `visreg` binary serves the same tasks across a process boundary.

use crate::compare::ComparisonRequest;
use crate::engine::SnapshotEngine;
use crate::envelope::ErrorEnvelope;
use crate::result::{VisregError, VisregResult};
use crate::update::UpdateRequest;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Task comparing a screenshot against its base
pub const COMPARE_SNAPSHOTS: &str = "compareSnapshots";
/// Task copying a screenshot into the base tree
pub const UPDATE_SNAPSHOT: &str = "updateSnapshot";

/// Every task name the engine serves
pub const TASK_NAMES: [&str; 2] = [COMPARE_SNAPSHOTS, UPDATE_SNAPSHOT];

/// Invoke named tasks with JSON arguments
#[async_trait]
pub trait TaskTransport: Send + Sync {
    /// Run `task` with `arg`
    async fn invoke(&self, task: &str, arg: Value) -> Result<Value, ErrorEnvelope>;
}

/// Invoke `task` with a typed argument and decode a typed result
pub async fn call<A, R>(transport: &(impl TaskTransport + ?Sized), task: &str, arg: &A) -> VisregResult<R>
where
    A: Serialize + Sync,
    R: DeserializeOwned,
{
    let arg = serde_json::to_value(arg)?;
    let value = transport
        .invoke(task, arg)
        .await
        .map_err(ErrorEnvelope::into_error)?;
    Ok(serde_json::from_value(value)?)
}

/// Reply as written on the wire: `{"result": ...}` or `{"error": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskReply {
    /// Task completed
    Result(Value),
    /// Task failed
    Error(ErrorEnvelope),
}

impl TaskReply {
    /// Serialize to JSON text
    #[must_use]
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse JSON text produced by [`TaskReply::encode`]
    pub fn decode(text: &str) -> VisregResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| VisregError::invalid_payload(format!("malformed task reply: {e}")))
    }

    /// Whether the task failed
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Unwrap into the transport result shape
    pub fn into_result(self) -> Result<Value, ErrorEnvelope> {
        match self {
            Self::Result(value) => Ok(value),
            Self::Error(envelope) => Err(envelope),
        }
    }
}

impl From<Result<Value, ErrorEnvelope>> for TaskReply {
    fn from(outcome: Result<Value, ErrorEnvelope>) -> Self {
        match outcome {
            Ok(value) => Self::Result(value),
            Err(envelope) => Self::Error(envelope),
        }
    }
}

/// Serves tasks from an in-process engine
#[derive(Debug, Clone)]
pub struct LocalTransport {
    engine: SnapshotEngine,
}

impl LocalTransport {
    /// Transport backed by `engine`
    #[must_use]
    pub const fn new(engine: SnapshotEngine) -> Self {
        Self { engine }
    }

    /// Engine serving the tasks
    #[must_use]
    pub const fn engine(&self) -> &SnapshotEngine {
        &self.engine
    }

    /// Run `task`, keeping the typed error
    pub async fn dispatch(&self, task: &str, arg: Value) -> VisregResult<Value> {
        debug!(task, "dispatching task");
        match task {
            COMPARE_SNAPSHOTS => {
                let request: ComparisonRequest = parse_arg(task, arg)?;
                let result = self.engine.compare_snapshots(&request).await?;
                Ok(serde_json::to_value(result)?)
            }
            UPDATE_SNAPSHOT => {
                let request: UpdateRequest = parse_arg(task, arg)?;
                let result = self.engine.update_snapshot(&request).await?;
                Ok(serde_json::to_value(result)?)
            }
            other => Err(VisregError::UnknownTask {
                name: other.to_string(),
            }),
        }
    }
}

#[async_trait]
impl TaskTransport for LocalTransport {
    async fn invoke(&self, task: &str, arg: Value) -> Result<Value, ErrorEnvelope> {
        self.dispatch(task, arg)
            .await
            .map_err(|e| ErrorEnvelope::from(&e))
    }
}

fn parse_arg<T: DeserializeOwned>(task: &str, arg: Value) -> VisregResult<T> {
    serde_json::from_value(arg)
        .map_err(|e| VisregError::invalid_payload(format!("{task}: {e}")))
}
