//! visreg CLI: process-level task transport
//!
//! The host test runner spawns `visreg task <name>` with a JSON argument and
//! reads one JSON reply from stdout: `{"result": ...}` with exit status 0, or
//! `{"error": {"kind", "message", "stack"?}}` with exit status 1.

#![warn(missing_docs)]

pub mod commands;
mod error;
pub mod runner;

pub use commands::{Cli, Commands, TaskArgs};
pub use error::{CliError, CliResult};
pub use runner::{
    exit_status, parse_payload, read_payload, render_reply, run_task, EXIT_CLI_ERROR,
    EXIT_ENVELOPE, EXIT_RESULT,
};

use visreg::{Logger, LoggingConfig};

/// Logger selected by the global flags, falling back to `VISUAL_REGRESSION_LOG`
#[must_use]
pub fn logger_for(cli: &Cli) -> Logger {
    if cli.verbose || cli.log_json {
        Logger::from_config(LoggingConfig {
            verbose: true,
            json: cli.log_json,
        })
    } else {
        Logger::from_env()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_verbose_flag_enables_logger() {
        let cli = Cli::parse_from(["visreg", "--verbose", "task", "x"]);
        assert!(logger_for(&cli).is_verbose());

        let cli = Cli::parse_from(["visreg", "--log-json", "task", "x"]);
        assert!(logger_for(&cli).is_verbose());
    }
}
