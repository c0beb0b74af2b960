//! Analysis domain types.

mod request;
mod result;

pub use request::{ANALYZE_IMAGE_PATH, ANALYZE_RAW_IMAGE_PATH, AnalysisRequest, ImagePayload};
pub use result::{AnalysisResult, ResultKind, UnknownResultKind};
