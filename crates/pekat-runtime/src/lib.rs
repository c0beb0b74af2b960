//! Runtime for driving a PEKAT VISION analysis server.
//!
//! - [`Analyzer`] - start a local server or attach to a remote one, then
//!   analyze images
//! - [`ports`] - free port pair discovery for local servers
//! - [`process`] - spawning and supervising the server process
//! - [`health`] - readiness probing raced against process exit
//! - [`protocol`] - analyze request encoding and response decoding
//! - [`dist`] - locating the server executable in a distribution

#![deny(unsafe_code)]

mod analyzer;
pub mod dist;
pub mod health;
pub mod ports;
pub mod process;
pub mod protocol;

pub use analyzer::{Analyzer, build_http_client};

// Re-export the building blocks for callers that drive a server themselves
pub use health::{HttpProbe, ProbeError, ServerProbe, ping_once, wait_until_ready};
pub use ports::{LoopbackProbe, PortProbe, find_free_port_pair, find_free_port_pair_with};
pub use process::{ExitSignal, ProcessExit, ServerArgs, ServerProcess};

// Core types callers need alongside the analyzer
pub use pekat_core::{
    AnalysisResult, AnalyzerConfig, AnalyzerError, AnalyzerResult, LocalLaunch, RemoteTarget,
    ResultKind,
};
