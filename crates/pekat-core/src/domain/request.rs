//! Analysis requests.
//!
//! A request is built per call and discarded once the response is decoded.

use bytes::Bytes;
use std::path::PathBuf;

use crate::domain::ResultKind;
use crate::error::{AnalyzerError, AnalyzerResult};

/// Server path for encoded images (PNG, JPEG, BMP, ...).
pub const ANALYZE_IMAGE_PATH: &str = "/analyze_image";

/// Server path for raw RGB pixel buffers.
pub const ANALYZE_RAW_IMAGE_PATH: &str = "/analyze_raw_image";

/// Image data to send to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    /// An encoded image read from disk when the request is sent.
    File(PathBuf),
    /// An encoded image already in memory.
    Encoded(Bytes),
    /// Raw pixels, three bytes per pixel, row-major.
    Raw { pixels: Bytes, width: u32, height: u32 },
}

impl ImagePayload {
    /// Server path this payload is posted to.
    pub const fn endpoint(&self) -> &'static str {
        match self {
            Self::File(_) | Self::Encoded(_) => ANALYZE_IMAGE_PATH,
            Self::Raw { .. } => ANALYZE_RAW_IMAGE_PATH,
        }
    }

    /// Width and height for raw payloads.
    pub const fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Self::Raw { width, height, .. } => Some((*width, *height)),
            Self::File(_) | Self::Encoded(_) => None,
        }
    }
}

/// One analysis call, fully described.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub payload: ImagePayload,
    pub kind: ResultKind,
    /// Opaque string passed through to the server untouched.
    pub data: Option<String>,
    /// Ask the server to embed the context in the response body.
    pub context_in_body: bool,
}

impl AnalysisRequest {
    pub fn new(payload: ImagePayload, kind: ResultKind) -> Self {
        Self {
            payload,
            kind,
            data: None,
            context_in_body: false,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Option<impl Into<String>>) -> Self {
        self.data = data.map(Into::into);
        self
    }

    #[must_use]
    pub const fn with_context_in_body(mut self, enabled: bool) -> Self {
        self.context_in_body = enabled;
        self
    }

    pub const fn endpoint(&self) -> &'static str {
        self.payload.endpoint()
    }

    pub const fn dimensions(&self) -> Option<(u32, u32)> {
        self.payload.dimensions()
    }

    /// Check the payload before anything is sent.
    ///
    /// Raw buffers must be non-empty and exactly `width * height * 3` bytes.
    pub fn validate(&self) -> AnalyzerResult<()> {
        match &self.payload {
            ImagePayload::File(path) if path.as_os_str().is_empty() => {
                Err(AnalyzerError::configuration("Image path must not be empty"))
            }
            ImagePayload::Raw {
                pixels,
                width,
                height,
            } => {
                if *width == 0 || *height == 0 {
                    return Err(AnalyzerError::Configuration(format!(
                        "Raw image dimensions must be positive, got {width}x{height}"
                    )));
                }
                let expected = u64::from(*width) * u64::from(*height) * 3;
                if pixels.len() as u64 != expected {
                    return Err(AnalyzerError::Configuration(format!(
                        "Raw image buffer holds {} bytes, expected {expected} for {width}x{height} RGB",
                        pixels.len()
                    )));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(width: u32, height: u32, len: usize) -> AnalysisRequest {
        AnalysisRequest::new(
            ImagePayload::Raw {
                pixels: Bytes::from(vec![0u8; len]),
                width,
                height,
            },
            ResultKind::Heatmap,
        )
    }

    #[test]
    fn encoded_payloads_go_to_analyze_image() {
        let file = AnalysisRequest::new(ImagePayload::File("a.png".into()), ResultKind::Context);
        assert_eq!(file.endpoint(), ANALYZE_IMAGE_PATH);
        assert_eq!(file.dimensions(), None);

        let memory = AnalysisRequest::new(
            ImagePayload::Encoded(Bytes::from_static(b"\x89PNG")),
            ResultKind::Context,
        );
        assert_eq!(memory.endpoint(), ANALYZE_IMAGE_PATH);
    }

    #[test]
    fn raw_payload_goes_to_analyze_raw_image() {
        let request = raw(100, 50, 100 * 50 * 3);
        assert_eq!(request.endpoint(), ANALYZE_RAW_IMAGE_PATH);
        assert_eq!(request.dimensions(), Some((100, 50)));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn raw_payload_with_wrong_length_is_rejected() {
        let err = raw(10, 10, 299).validate().unwrap_err();
        assert!(matches!(err, AnalyzerError::Configuration(_)));
        assert!(err.to_string().contains("expected 300"));
    }

    #[test]
    fn raw_payload_with_zero_dimension_is_rejected() {
        assert!(raw(0, 10, 0).validate().is_err());
        assert!(raw(10, 0, 0).validate().is_err());
    }

    #[test]
    fn empty_file_path_is_rejected() {
        let request = AnalysisRequest::new(ImagePayload::File(PathBuf::new()), ResultKind::Context);
        assert!(request.validate().is_err());
    }

    #[test]
    fn builder_sets_data_and_context_mode() {
        let request = raw(1, 1, 3)
            .with_data(Some("batch-7"))
            .with_context_in_body(true);
        assert_eq!(request.data.as_deref(), Some("batch-7"));
        assert!(request.context_in_body);
    }
}
