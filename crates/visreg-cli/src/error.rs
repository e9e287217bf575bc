//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that stop the CLI before a task reply can be written
#[derive(Debug, Error)]
pub enum CliError {
    /// Payload could not be read
    #[error("Failed to read payload: {message}")]
    Payload {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// visreg library error
    #[error("visreg error: {0}")]
    Visreg(#[from] visreg::VisregError),
}

impl CliError {
    /// Create a payload error
    #[must_use]
    pub fn payload(message: impl Into<String>) -> Self {
        Self::Payload {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_error_display() {
        let err = CliError::payload("stdin closed");
        assert_eq!(err.to_string(), "Failed to read payload: stdin closed");
    }

    #[test]
    fn test_from_visreg_error() {
        let err: CliError = visreg::VisregError::invalid_payload("bad").into();
        assert!(matches!(err, CliError::Visreg(_)));
        assert_eq!(err.to_string(), "visreg error: Invalid payload: bad");
    }

    #[test]
    fn test_from_io_error() {
        let err: CliError = std::io::Error::from(std::io::ErrorKind::BrokenPipe).into();
        assert!(err.to_string().starts_with("I/O error:"));
    }
}
