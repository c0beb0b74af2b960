//! Core domain types for the PEKAT VISION client.
//!
//! This crate holds the shapes the runtime produces and consumes: result
//! kinds, analysis requests and results, the error taxonomy and the
//! configuration types. It has no process or HTTP dependencies; those live in
//! `pekat-runtime`.

pub mod domain;
pub mod error;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    ANALYZE_IMAGE_PATH, ANALYZE_RAW_IMAGE_PATH, AnalysisRequest, AnalysisResult, ImagePayload,
    ResultKind, UnknownResultKind,
};
pub use error::{AnalyzerError, AnalyzerResult};
pub use settings::{
    AnalyzerConfig, DEFAULT_HOST, DEFAULT_PORT_RANGE_END, DEFAULT_PORT_RANGE_START,
    DEFAULT_STOP_GRACE_SECS, LocalLaunch, RemoteTarget,
};
