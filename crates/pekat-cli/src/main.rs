//! CLI entry point.
//!
//! Starts or attaches the analyzer, dispatches the command and shuts the
//! analyzer down on every path, including failures and Ctrl-C.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use pekat_cli::{Cli, CliError, connect, handlers};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let analyzer = connect(&cli).await.context("Failed to start analyzer")?;

    let outcome = tokio::select! {
        result = handlers::dispatch(&analyzer, &cli.command) => result,
        _ = tokio::signal::ctrl_c() => Err(CliError::Interrupted),
    };

    if let Some(exit) = analyzer.shutdown().await {
        debug!(code = ?exit.code, "Local server stopped");
    }

    outcome.map_err(Into::into)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}
