//! Command handlers.
//!
//! Handlers receive a ready [`Analyzer`], do their work and print results.
//! Starting and stopping the analyzer is the caller's job.

use pekat_runtime::Analyzer;

use crate::commands::Commands;
use crate::error::CliError;

pub mod analyze;
pub mod ping;

/// Run a command against a ready analyzer.
pub async fn dispatch(analyzer: &Analyzer, command: &Commands) -> Result<(), CliError> {
    match command {
        Commands::Analyze { files, output } => analyze::execute(analyzer, files, output).await,
        Commands::AnalyzeRaw {
            file,
            width,
            height,
            output,
        } => analyze::execute_raw(analyzer, file, *width, *height, output).await,
        Commands::Ping => ping::execute(analyzer).await,
    }
}
