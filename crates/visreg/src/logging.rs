//! Explicit logger handle.
//!
//! The library never installs a global subscriber. Each [`Logger`] owns a
//! `tracing` dispatcher, and engine operations run scoped to it, so a silent
//! engine and a verbose one can coexist in the same process.

use crate::config::parse_flag;
use std::future::Future;
use tracing::instrument::WithSubscriber;
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

/// Environment variable enabling verbose logging
pub const ENV_LOG: &str = "VISUAL_REGRESSION_LOG";

const DEFAULT_FILTER: &str = "visreg=debug";

/// Logging configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoggingConfig {
    /// Emit diagnostics to stderr
    pub verbose: bool,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl LoggingConfig {
    /// Verbose when `VISUAL_REGRESSION_LOG` is set to a truthy value
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_value(std::env::var(ENV_LOG).ok().as_deref())
    }

    fn from_value(value: Option<&str>) -> Self {
        Self {
            verbose: value.and_then(parse_flag).unwrap_or(false),
            json: false,
        }
    }
}

/// Logger instance handed to the engine
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
    verbose: bool,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::silent()
    }
}

impl Logger {
    /// Drop every event
    #[must_use]
    pub fn silent() -> Self {
        Self {
            dispatch: Dispatch::none(),
            verbose: false,
        }
    }

    /// Human-readable events on stderr, filtered by `RUST_LOG` or `visreg=debug`
    #[must_use]
    pub fn verbose() -> Self {
        Self::from_config(LoggingConfig {
            verbose: true,
            json: false,
        })
    }

    /// Build from an explicit configuration
    #[must_use]
    pub fn from_config(config: LoggingConfig) -> Self {
        if !config.verbose {
            return Self::silent();
        }

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true);

        let dispatch = if config.json {
            Dispatch::new(builder.json().finish())
        } else {
            Dispatch::new(builder.finish())
        };

        Self {
            dispatch,
            verbose: true,
        }
    }

    /// Silent unless `VISUAL_REGRESSION_LOG` asks for output
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_config(LoggingConfig::from_env())
    }

    /// Use a caller-provided dispatcher
    #[must_use]
    pub fn with_dispatch(dispatch: Dispatch) -> Self {
        Self {
            dispatch,
            verbose: true,
        }
    }

    /// Whether events are emitted
    #[must_use]
    pub const fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Run `future` with this logger as its subscriber
    pub async fn scope<F>(&self, future: F) -> F::Output
    where
        F: Future,
    {
        future.with_subscriber(self.dispatch.clone()).await
    }

    /// Run a synchronous closure with this logger as its subscriber
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_silent() {
        let logger = Logger::default();
        assert!(!logger.is_verbose());
    }

    #[test]
    fn test_config_from_value() {
        assert!(LoggingConfig::from_value(Some("1")).verbose);
        assert!(LoggingConfig::from_value(Some("true")).verbose);
        assert!(!LoggingConfig::from_value(Some("off")).verbose);
        assert!(!LoggingConfig::from_value(Some("garbage")).verbose);
        assert!(!LoggingConfig::from_value(None).verbose);
    }

    #[test]
    fn test_from_config_respects_flag() {
        assert!(!Logger::from_config(LoggingConfig::default()).is_verbose());
        assert!(Logger::from_config(LoggingConfig {
            verbose: true,
            json: true
        })
        .is_verbose());
    }

    #[test]
    fn test_in_scope_returns_value() {
        let logger = Logger::silent();
        let value = logger.in_scope(|| {
            tracing::debug!("dropped");
            7
        });
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_scope_returns_output() {
        let logger = Logger::silent();
        let value = logger
            .scope(async {
                tracing::info!("dropped");
                "done"
            })
            .await;
        assert_eq!(value, "done");
    }
}
