//! Main CLI parser and top-level argument handling.

use clap::{Args, Parser};
use std::path::PathBuf;

use crate::commands::Commands;

/// Analyze images with a PEKAT VISION server.
///
/// Without `--host` a server is started locally from `--dist` for the
/// duration of the command.
#[derive(Parser, Debug)]
#[command(name = "pekat")]
#[command(about = "Analyze images with a PEKAT VISION server")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Ask the server to embed the context in the response body
    #[arg(long = "context-in-body", global = true)]
    pub context_in_body: bool,

    /// API key required by the server
    #[arg(long = "api-key", global = true, env = "PEKAT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[command(flatten)]
    pub target: TargetArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which server to talk to.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Attach to a running server on this host instead of starting one
    #[arg(long)]
    pub host: Option<String>,

    /// Port of the running server (with --host)
    #[arg(long)]
    pub port: Option<u16>,

    /// Server distribution directory (defaults to PEKAT_DIST_PATH)
    #[arg(long = "dist")]
    pub dist: Option<PathBuf>,

    /// Project directory for a locally started server
    #[arg(long = "project")]
    pub project: Option<PathBuf>,

    /// Extra options passed to a locally started server
    #[arg(long = "options", allow_hyphen_values = true)]
    pub options: Option<String>,
}
