//! HTTP protocol spoken with the analysis server.
//!
//! - `encode` - analyze request URL and body
//! - `decode` - analyze response into an `AnalysisResult`

mod decode;
mod encode;

pub use decode::{CONTEXT_HEADER, IMAGE_LEN_HEADER, decode};
pub use encode::{OCTET_STREAM, encode_url, load_body};

/// Path of the protocol stop endpoint on a locally spawned server.
pub const STOP_PATH: &str = "/stop";
