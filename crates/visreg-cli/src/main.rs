//! visreg CLI: run snapshot tasks for a host test runner
//!
//! ## Usage
//!
//! ```bash
//! visreg task updateSnapshot --payload '{"specPath":"home.spec","name":"hero","actualPath":"/tmp/hero.png"}'
//! echo '{"specPath":"home.spec","name":"hero","actualPath":"/tmp/hero.png"}' | visreg task compareSnapshots
//! ```

use clap::Parser;
use std::process::ExitCode;
use visreg::{LocalTransport, SnapshotEngine};
use visreg_cli::{
    exit_status, logger_for, read_payload, render_reply, run_task, Cli, CliResult, Commands,
    EXIT_CLI_ERROR,
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(status) => ExitCode::from(status),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_CLI_ERROR)
        }
    }
}

async fn run() -> CliResult<u8> {
    let cli = Cli::parse();
    let logger = logger_for(&cli);

    let engine = match &cli.cwd {
        Some(cwd) => SnapshotEngine::new(cwd.clone()),
        None => SnapshotEngine::from_current_dir()?,
    }
    .with_logger(logger.clone());

    match cli.command {
        Commands::Task(args) => {
            let payload = read_payload(&args).await?;
            let transport = LocalTransport::new(engine);
            let reply = logger
                .scope(run_task(&transport, &args.name, &payload))
                .await;
            println!("{}", render_reply(&reply, args.pretty)?);
            Ok(exit_status(&reply))
        }
    }
}
