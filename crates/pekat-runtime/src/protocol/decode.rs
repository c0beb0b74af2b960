//! Response decoding for the analyze endpoints.
//!
//! The payload layout depends on the requested kind and on whether context
//! was requested in the body:
//!
//! | kind      | context in body | body                     | context from          |
//! |-----------|-----------------|--------------------------|-----------------------|
//! | context   | any             | context text             | body                  |
//! | image     | yes             | image ++ context         | body after `ImageLen` |
//! | image     | no              | image                    | `ContextBase64utf`    |

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use pekat_core::{AnalysisResult, AnalyzerError, AnalyzerResult, ResultKind};
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use tracing::warn;

/// Length of the image prefix when context is embedded in the body.
/// Sent by the server as `ImageLen`; header names are case-insensitive.
pub const IMAGE_LEN_HEADER: &str = "imagelen";

/// Base64 of the UTF-8 context when it is not embedded in the body.
/// Sent by the server as `ContextBase64utf`.
pub const CONTEXT_HEADER: &str = "contextbase64utf";

/// Longest body excerpt quoted in error messages.
const ERROR_EXCERPT_LEN: usize = 200;

/// Turn a raw HTTP response into an [`AnalysisResult`].
pub fn decode(
    kind: ResultKind,
    context_in_body: bool,
    status: StatusCode,
    headers: &HeaderMap,
    mut body: Bytes,
) -> AnalyzerResult<AnalysisResult> {
    if !status.is_success() {
        return Err(AnalyzerError::Protocol(format!(
            "Server returned {status}: {}",
            excerpt(&body)
        )));
    }

    if !kind.returns_image() {
        return Ok(AnalysisResult::context_only(kind, text(&body)));
    }

    if context_in_body {
        let Some(value) = headers.get(IMAGE_LEN_HEADER) else {
            // Whatever image the server may have sent is dropped here
            warn!(kind = %kind, "Response has no ImageLen header, treating whole body as context");
            return Ok(AnalysisResult::context_only(kind, text(&body)));
        };

        let image_len = value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .ok_or_else(|| {
                AnalyzerError::Protocol(format!("Invalid ImageLen header: {value:?}"))
            })?;
        if image_len > body.len() {
            return Err(AnalyzerError::Protocol(format!(
                "ImageLen {image_len} exceeds body length {}",
                body.len()
            )));
        }

        let image = body.split_to(image_len);
        return Ok(AnalysisResult::with_image(kind, image, Some(text(&body))));
    }

    let context = match headers.get(CONTEXT_HEADER) {
        Some(value) => {
            let decoded = STANDARD.decode(value.as_bytes()).map_err(|e| {
                AnalyzerError::Protocol(format!("Invalid ContextBase64utf header: {e}"))
            })?;
            Some(text(&decoded))
        }
        None => None,
    };

    Ok(AnalysisResult::with_image(kind, body, context))
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    match trimmed.char_indices().nth(ERROR_EXCERPT_LEN) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
