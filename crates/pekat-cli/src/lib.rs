//! `pekat` command-line client.
//!
//! Starts a local analysis server (or attaches to a remote one), runs the
//! requested command and always shuts the analyzer down afterwards.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tokio_test as _;

// Used by the binary only
use anyhow as _;
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;

// Re-export primary types for convenient access
pub use bootstrap::{Target, analyzer_config, connect, resolve_target};
pub use commands::{Commands, OutputArgs};
pub use error::CliError;
pub use parser::{Cli, TargetArgs};
