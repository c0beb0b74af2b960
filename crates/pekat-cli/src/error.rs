//! CLI-specific error types and mappings.
//!
//! Maps [`AnalyzerError`] to exit codes and user-facing messages.

use pekat_core::AnalyzerError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid or inconsistent arguments.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The server process could not be started.
    #[error("Process error: {0}")]
    Process(String),

    /// The server could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server answered with an error or an unreadable response.
    #[error("Server error: {0}")]
    Protocol(String),

    /// Stopped by Ctrl-C.
    #[error("Interrupted")]
    Interrupted,
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Specific error categories (see sysexits.h)
    /// - 130: Terminated by SIGINT
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Arguments(_) => 2,
            Self::Connection(_) => 69, // EX_UNAVAILABLE
            Self::Process(_) => 71,    // EX_OSERR
            Self::Io(_) => 74,         // EX_IOERR
            Self::Protocol(_) => 76,   // EX_PROTOCOL
            Self::Config(_) => 78,     // EX_CONFIG
            Self::Interrupted => 130,
        }
    }
}

impl From<AnalyzerError> for CliError {
    fn from(err: AnalyzerError) -> Self {
        match err {
            AnalyzerError::Configuration(msg) => Self::Config(msg),
            e @ (AnalyzerError::PortExhausted { .. }
            | AnalyzerError::Spawn { .. }
            | AnalyzerError::ProcessStartup { .. }
            | AnalyzerError::StartupTimeout(_)) => Self::Process(e.to_string()),
            AnalyzerError::Connection(msg) => Self::Connection(msg),
            AnalyzerError::Protocol(msg) => Self::Protocol(msg),
            AnalyzerError::Io(e) => Self::Io(e.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn startup_failures_map_to_process_errors() {
        let errors = [
            AnalyzerError::PortExhausted {
                start: 10000,
                end: 10002,
            },
            AnalyzerError::Spawn {
                path: PathBuf::from("/opt/pekat/pekat_vision/pekat_vision"),
                reason: "permission denied".into(),
            },
            AnalyzerError::ProcessStartup { code: Some(3) },
            AnalyzerError::StartupTimeout(Duration::from_secs(5)),
        ];
        for err in errors {
            let cli = CliError::from(err);
            assert!(matches!(cli, CliError::Process(_)), "{cli}");
            assert_eq!(cli.exit_code(), 71);
        }
    }

    #[test]
    fn exit_codes_follow_sysexits() {
        assert_eq!(
            CliError::from(AnalyzerError::configuration("bad")).exit_code(),
            78
        );
        assert_eq!(
            CliError::from(AnalyzerError::Connection("refused".into())).exit_code(),
            69
        );
        assert_eq!(
            CliError::from(AnalyzerError::Protocol("500".into())).exit_code(),
            76
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(CliError::from(AnalyzerError::Io(io)).exit_code(), 74);
        assert_eq!(CliError::Arguments("x".into()).exit_code(), 2);
        assert_eq!(CliError::Interrupted.exit_code(), 130);
    }

    #[test]
    fn process_startup_message_keeps_exit_code() {
        let cli = CliError::from(AnalyzerError::ProcessStartup { code: Some(3) });
        assert!(cli.to_string().contains("exit code: 3"));
    }
}
