//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// visreg: serve visual regression snapshot tasks over stdin/stdout
#[derive(Parser, Debug)]
#[command(name = "visreg")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log diagnostics to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log as JSON lines (implies --verbose)
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Directory the default snapshot roots are resolved against
    #[arg(long, global = true, env = "VISUAL_REGRESSION_CWD")]
    pub cwd: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a named task and print its JSON reply
    Task(TaskArgs),
}

/// Arguments for the `task` command
#[derive(Args, Debug)]
pub struct TaskArgs {
    /// Task name (compareSnapshots or updateSnapshot)
    pub name: String,

    /// JSON argument; read from stdin when neither this nor --payload-file is given
    #[arg(short, long, conflicts_with = "payload_file")]
    pub payload: Option<String>,

    /// File holding the JSON argument
    #[arg(long)]
    pub payload_file: Option<PathBuf>,

    /// Pretty-print the reply
    #[arg(long)]
    pub pretty: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_task_command() {
            let cli = Cli::parse_from(["visreg", "task", "compareSnapshots"]);
            let Commands::Task(args) = cli.command;
            assert_eq!(args.name, "compareSnapshots");
            assert!(args.payload.is_none());
            assert!(!args.pretty);
            assert!(!cli.verbose);
        }

        #[test]
        fn test_parse_inline_payload() {
            let cli = Cli::parse_from([
                "visreg",
                "task",
                "updateSnapshot",
                "--payload",
                r#"{"name":"a"}"#,
            ]);
            let Commands::Task(args) = cli.command;
            assert_eq!(args.payload.as_deref(), Some(r#"{"name":"a"}"#));
        }

        #[test]
        fn test_global_flags_after_subcommand() {
            let cli = Cli::parse_from(["visreg", "task", "x", "-v", "--cwd", "/work"]);
            assert!(cli.verbose);
            assert_eq!(cli.cwd, Some(PathBuf::from("/work")));
        }

        #[test]
        fn test_payload_sources_conflict() {
            let result = Cli::try_parse_from([
                "visreg",
                "task",
                "x",
                "--payload",
                "{}",
                "--payload-file",
                "p.json",
            ]);
            assert!(result.is_err());
        }

        #[test]
        fn test_task_name_required() {
            assert!(Cli::try_parse_from(["visreg", "task"]).is_err());
        }
    }
}
