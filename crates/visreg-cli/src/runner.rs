//! Task execution for the `task` command.

use crate::commands::TaskArgs;
use crate::error::{CliError, CliResult};
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing::debug;
use visreg::{ErrorEnvelope, TaskReply, TaskTransport, VisregError, VisregResult};

/// Exit status for a task result
pub const EXIT_RESULT: u8 = 0;
/// Exit status for an error envelope
pub const EXIT_ENVELOPE: u8 = 1;
/// Exit status when no reply could be produced
pub const EXIT_CLI_ERROR: u8 = 2;

/// Read the JSON argument from `--payload`, `--payload-file` or stdin
pub async fn read_payload(args: &TaskArgs) -> CliResult<String> {
    if let Some(payload) = &args.payload {
        return Ok(payload.clone());
    }
    if let Some(path) = &args.payload_file {
        return tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CliError::payload(format!("{}: {e}", path.display())));
    }

    let mut payload = String::new();
    tokio::io::stdin()
        .read_to_string(&mut payload)
        .await
        .map_err(|e| CliError::payload(format!("stdin: {e}")))?;
    Ok(payload)
}

/// Parse a task argument; blank input is `null`
pub fn parse_payload(text: &str) -> VisregResult<Value> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text)
        .map_err(|e| VisregError::invalid_payload(format!("task argument is not JSON: {e}")))
}

/// Run `name` with the raw payload text
///
/// Every failure, including a malformed payload, becomes an error envelope.
pub async fn run_task(transport: &impl TaskTransport, name: &str, payload: &str) -> TaskReply {
    let arg = match parse_payload(payload) {
        Ok(arg) => arg,
        Err(e) => return TaskReply::Error(ErrorEnvelope::from(&e)),
    };
    let reply = TaskReply::from(transport.invoke(name, arg).await);
    debug!(task = name, failed = reply.is_error(), "task finished");
    reply
}

/// Serialize the reply for stdout
pub fn render_reply(reply: &TaskReply, pretty: bool) -> CliResult<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(reply)?)
    } else {
        Ok(serde_json::to_string(reply)?)
    }
}

/// Exit status for a reply
pub const fn exit_status(reply: &TaskReply) -> u8 {
    if reply.is_error() {
        EXIT_ENVELOPE
    } else {
        EXIT_RESULT
    }
}
