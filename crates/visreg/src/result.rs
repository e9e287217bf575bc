//! Result and error types for visreg.

use crate::envelope::{ErrorEnvelope, ErrorKind};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for visreg operations
pub type VisregResult<T> = Result<T, VisregError>;

/// Errors that can occur while resolving, comparing or updating snapshots
#[derive(Debug, Error)]
pub enum VisregError {
    /// Referenced image file is absent
    #[error("Snapshot {} does not exist.", path.display())]
    NotFound {
        /// Path that was looked up
        path: PathBuf,
    },

    /// PNG data could not be decoded
    #[error("Failed to decode image '{}': {message}", path.display())]
    Decode {
        /// Path of the malformed file
        path: PathBuf,
        /// Decoder message
        message: String,
    },

    /// Snapshot name is empty after sanitisation
    #[error("Snapshot name {name:?} is empty after sanitization")]
    InvalidName {
        /// Name as supplied by the caller
        name: String,
    },

    /// Spec path escapes the snapshot root
    #[error("Spec path '{}' must be relative and must not contain '..'", path.display())]
    InvalidSpecPath {
        /// Offending spec path
        path: PathBuf,
    },

    /// Parent directory could not be created
    #[error("Failed to create directory '{}'.", path.display())]
    DirectoryCreate {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// File could not be written after its directory was created
    #[error("Failed to write file '{}'.", path.display())]
    FileWrite {
        /// Target file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Actual screenshot could not be copied into the base directory
    #[error("Failed to copy file from '{}' to '{}'.", from.display(), to.display())]
    Copy {
        /// Source file
        from: PathBuf,
        /// Destination file
        to: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Screenshot could not be moved out of the common-root nesting
    #[error("Failed to move file from '{}' to '{}'.", from.display(), to.display())]
    Relocate {
        /// Original location
        from: PathBuf,
        /// Canonical location
        to: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Raster could not be encoded as PNG
    #[error("Failed to encode image: {message}")]
    Encode {
        /// Encoder message
        message: String,
    },

    /// Raster buffer does not match its declared dimensions
    #[error("Buffer length {actual} does not match expected {expected}")]
    DimensionMismatch {
        /// Expected byte length (`width * height * 4`)
        expected: usize,
        /// Byte length received
        actual: usize,
    },

    /// Comparison exceeded the configured error threshold
    #[error("{message}")]
    ThresholdExceeded {
        /// Human-readable failure naming snapshot, threshold and percentage
        message: String,
    },

    /// Task name not registered with the transport
    #[error("Unknown task: {name}")]
    UnknownTask {
        /// Requested task name
        name: String,
    },

    /// Task argument, configuration value or envelope could not be interpreted
    #[error("Invalid payload: {message}")]
    InvalidPayload {
        /// What was wrong with it
        message: String,
    },

    /// Error reported by the other side of the task transport
    #[error("{}", .0.message)]
    Remote(ErrorEnvelope),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VisregError {
    /// Create an invalid payload error
    #[must_use]
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    /// Classify this error for the transport envelope
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::InvalidName { .. } | Self::InvalidSpecPath { .. } => ErrorKind::InvalidName,
            Self::DirectoryCreate { .. } => ErrorKind::DirectoryCreate,
            Self::FileWrite { .. } => ErrorKind::FileWrite,
            Self::Copy { .. } | Self::Relocate { .. } => ErrorKind::Copy,
            Self::Encode { .. } | Self::DimensionMismatch { .. } => ErrorKind::Encode,
            Self::ThresholdExceeded { .. } => ErrorKind::ThresholdExceeded,
            Self::UnknownTask { .. } => ErrorKind::UnknownTask,
            Self::InvalidPayload { .. } | Self::Json(_) => ErrorKind::InvalidPayload,
            Self::Remote(envelope) => envelope.kind,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether this is a missing-file error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound)
    }
}
