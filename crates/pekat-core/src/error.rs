//! Error taxonomy for analyzer operations.
//!
//! Every failure is returned to the caller of the operation that caused it.
//! Adapters (the CLI) map these onto their own exit codes and messages.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while starting, using or stopping an analyzer.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Missing or invalid configuration (empty paths, bad ranges, bad buffers).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No two consecutive free ports were found in the scanned range.
    #[error("Unable to find two consecutive free TCP ports in range {start}-{end}")]
    PortExhausted { start: u16, end: u16 },

    /// The server process could not be launched at all.
    #[error("Failed to spawn {path}: {reason}")]
    Spawn { path: PathBuf, reason: String },

    /// The server process terminated before it answered the readiness probe.
    #[error("Server process terminated before becoming ready (exit code: {})", describe_exit(.code))]
    ProcessStartup { code: Option<i32> },

    /// The server did not become ready within the configured startup timeout.
    #[error("Server did not become ready within {0:?}")]
    StartupTimeout(Duration),

    /// The server could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server answered with something this client cannot accept.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Local IO failed (reading a source image, for example).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyzerError {
    /// Shorthand for a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Shorthand for a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Whether repeating the same call could succeed without changing anything.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

#[allow(clippy::ref_option)]
fn describe_exit(code: &Option<i32>) -> String {
    code.map_or_else(|| "none, terminated by signal".to_string(), |c| c.to_string())
}

/// Result type alias for analyzer operations.
pub type AnalyzerResult<T> = Result<T, AnalyzerError>;
