//! Host-side snapshot command.
//!
//! The command owns the suite configuration, asks the host for a
//! screenshot, and routes it to the engine through a [`TaskTransport`].

use crate::compare::{ComparisonRequest, ComparisonResult};
use crate::config::{CompareArgs, ComparisonMode, SnapshotOptions};
use crate::result::VisregResult;
use crate::task::{self, TaskTransport, COMPARE_SNAPSHOTS, UPDATE_SNAPSHOT};
use crate::update::{UpdateRequest, UpdateResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Options forwarded untouched to the host's screenshot call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureOptions {
    /// Host-specific keys
    pub extra: Map<String, Value>,
}

impl CaptureOptions {
    /// Empty option set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a host option
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Screenshot produced by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedScreenshot {
    /// Absolute path of the written PNG
    pub path: PathBuf,
    /// Spec-relative directory the screenshot belongs to
    pub spec_path: PathBuf,
    /// Extra directory the host nested the screenshot under, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_root: Option<PathBuf>,
}

/// Screenshot source provided by the host test runner
#[async_trait]
pub trait ScreenshotCapture: Send + Sync {
    /// Capture a screenshot called `name`
    async fn capture(&self, name: &str, options: &CaptureOptions)
        -> VisregResult<CapturedScreenshot>;
}

/// What a snapshot command did
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOutcome {
    /// A base image was (re)generated
    Updated(UpdateResult),
    /// The screenshot was compared against its base
    Compared(ComparisonResult),
}

impl SnapshotOutcome {
    /// Comparison result, if a comparison ran
    #[must_use]
    pub const fn comparison(&self) -> Option<&ComparisonResult> {
        match self {
            Self::Compared(result) => Some(result),
            Self::Updated(_) => None,
        }
    }

    /// Whether the outcome is a passing comparison or a base update
    #[must_use]
    pub const fn is_success(&self) -> bool {
        match self {
            Self::Updated(_) => true,
            Self::Compared(result) => result.is_success(),
        }
    }
}

/// Snapshot command bound to a screenshot source and a task transport
#[derive(Debug)]
pub struct SnapshotCommand<C, T> {
    capture: C,
    transport: T,
    options: SnapshotOptions,
    capture_options: CaptureOptions,
}

impl<C, T> SnapshotCommand<C, T>
where
    C: ScreenshotCapture,
    T: TaskTransport,
{
    /// Command with default suite options
    #[must_use]
    pub fn new(capture: C, transport: T) -> Self {
        Self {
            capture,
            transport,
            options: SnapshotOptions::default(),
            capture_options: CaptureOptions::default(),
        }
    }

    /// Replace the suite options
    #[must_use]
    pub fn with_options(mut self, options: SnapshotOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the options passed to every capture
    #[must_use]
    pub fn with_capture_options(mut self, options: CaptureOptions) -> Self {
        self.capture_options = options;
        self
    }

    /// Suite options in use
    #[must_use]
    pub const fn options(&self) -> &SnapshotOptions {
        &self.options
    }

    /// Screenshot source
    #[must_use]
    pub const fn capture(&self) -> &C {
        &self.capture
    }

    /// Task transport
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Capture `name` and update or compare it according to the effective mode
    ///
    /// Unless fail-silently is set, a comparison over its threshold is
    /// returned as [`crate::VisregError::ThresholdExceeded`].
    pub async fn compare_snapshot(
        &self,
        name: &str,
        args: impl Into<CompareArgs> + Send,
    ) -> VisregResult<SnapshotOutcome> {
        let options = self.options.merged(&args.into().into_overrides());
        options.validate()?;

        let shot = self.capture.capture(name, &self.capture_options).await?;
        debug!(name, mode = %options.mode, path = %shot.path.display(), "captured screenshot");

        match options.mode {
            ComparisonMode::Base => {
                let mut request = UpdateRequest::new(&shot.spec_path, name, &shot.path);
                request.base_directory.clone_from(&options.base_directory);
                request.common_root = shot.common_root;
                let result: UpdateResult =
                    task::call(&self.transport, UPDATE_SNAPSHOT, &request).await?;
                Ok(SnapshotOutcome::Updated(result))
            }
            ComparisonMode::Regression => {
                let request =
                    ComparisonRequest::new(&shot.spec_path, name, &shot.path).with_options(&options);
                let result: ComparisonResult =
                    task::call(&self.transport, COMPARE_SNAPSHOTS, &request).await?;

                if let Some(failure) = result.failure() {
                    if !options.fail_silently {
                        return Err(failure);
                    }
                    warn!(name, percentage = result.percentage, "snapshot differs");
                }
                Ok(SnapshotOutcome::Compared(result))
            }
        }
    }
}
