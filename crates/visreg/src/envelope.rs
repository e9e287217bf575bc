//! Serializable error envelope for the task transport.
//!
//! Errors cross the host boundary as `{kind, message, stack?}` JSON rather
//! than as live error objects. The kind survives the round trip so the
//! calling side can still tell a missing base from a failed write.

use crate::result::{VisregError, VisregResult};
use serde::{Deserialize, Serialize};
use std::error::Error as _;

/// Error classification carried by an [`ErrorEnvelope`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Image file absent
    #[serde(rename = "NotFoundError")]
    NotFound,
    /// Malformed PNG data
    #[serde(rename = "DecodeError")]
    Decode,
    /// Snapshot name or spec path unusable
    #[serde(rename = "InvalidNameError")]
    InvalidName,
    /// Directory creation failed
    #[serde(rename = "DirectoryCreateError")]
    DirectoryCreate,
    /// File write failed
    #[serde(rename = "FileWriteError")]
    FileWrite,
    /// Copy or move failed
    #[serde(rename = "CopyError")]
    Copy,
    /// PNG encoding or raster shape failure
    #[serde(rename = "EncodeError")]
    Encode,
    /// Comparison exceeded its threshold
    #[serde(rename = "ThresholdExceededError")]
    ThresholdExceeded,
    /// Task name not served by the transport
    #[serde(rename = "UnknownTaskError")]
    UnknownTask,
    /// Task argument or configuration rejected
    #[serde(rename = "InvalidPayloadError")]
    InvalidPayload,
    /// Any other I/O failure
    #[serde(rename = "IoError")]
    Io,
}

/// Error as it travels across the task transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    /// Error classification
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
    /// Chain of underlying causes, one per line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorEnvelope {
    /// Create an envelope without a cause chain
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stack: None,
        }
    }

    /// Serialize to JSON text
    #[must_use]
    pub fn encode(&self) -> String {
        // Strings and a unit enum cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse JSON text produced by [`ErrorEnvelope::encode`]
    pub fn decode(text: &str) -> VisregResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| VisregError::invalid_payload(format!("malformed error envelope: {e}")))
    }

    /// Convert back into a library error on the receiving side
    #[must_use]
    pub fn into_error(self) -> VisregError {
        match self.kind {
            ErrorKind::ThresholdExceeded => VisregError::ThresholdExceeded {
                message: self.message,
            },
            _ => VisregError::Remote(self),
        }
    }
}

impl From<&VisregError> for ErrorEnvelope {
    fn from(err: &VisregError) -> Self {
        if let VisregError::Remote(envelope) = err {
            return envelope.clone();
        }

        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            kind: err.kind(),
            message: err.to_string(),
            stack: (!causes.is_empty()).then(|| causes.join("\n")),
        }
    }
}

impl From<VisregError> for ErrorEnvelope {
    fn from(err: VisregError) -> Self {
        Self::from(&err)
    }
}
