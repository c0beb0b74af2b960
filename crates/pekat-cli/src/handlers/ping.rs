//! Ping command handler.

use pekat_runtime::Analyzer;

use crate::error::CliError;

/// Report that the server is ready.
///
/// A local analyzer is ready by construction; a remote one is pinged once.
pub async fn execute(analyzer: &Analyzer) -> Result<(), CliError> {
    if !analyzer.is_local() {
        analyzer.ping().await?;
    }

    match analyzer.pid() {
        Some(pid) => println!("Server ready at {} (pid {pid})", analyzer.base_url()),
        None => println!("Server ready at {}", analyzer.base_url()),
    }
    Ok(())
}
