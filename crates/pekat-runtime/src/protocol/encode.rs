//! Request encoding for the analyze endpoints.

use bytes::Bytes;
use pekat_core::{AnalysisRequest, AnalyzerError, AnalyzerResult, ImagePayload};
use reqwest::Url;

/// Content type of every analyze request; the server sniffs the real format.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Build the target URL (path and query string) for a request.
///
/// Query parameters, in order: `response_type`, `api_key`, `data`, `width`
/// and `height` (raw payloads only), `context_in_body=1`.
pub fn encode_url(
    base_url: &Url,
    api_key: Option<&str>,
    request: &AnalysisRequest,
) -> AnalyzerResult<Url> {
    let mut url = base_url
        .join(request.endpoint())
        .map_err(|e| AnalyzerError::Configuration(format!("Invalid server URL: {e}")))?;

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("response_type", request.kind.as_wire_str());
        if let Some(key) = api_key {
            query.append_pair("api_key", key);
        }
        if let Some(data) = request.data.as_deref() {
            query.append_pair("data", data);
        }
        if let Some((width, height)) = request.dimensions() {
            query.append_pair("width", &width.to_string());
            query.append_pair("height", &height.to_string());
        }
        if request.context_in_body {
            query.append_pair("context_in_body", "1");
        }
    }

    Ok(url)
}

/// Load the request body.
///
/// Files are read here, so a missing file surfaces as an IO error before
/// anything is sent.
pub async fn load_body(payload: &ImagePayload) -> AnalyzerResult<Bytes> {
    match payload {
        ImagePayload::File(path) => Ok(Bytes::from(tokio::fs::read(path).await?)),
        ImagePayload::Encoded(bytes) => Ok(bytes.clone()),
        ImagePayload::Raw { pixels, .. } => Ok(pixels.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pekat_core::ResultKind;
    use std::io::Write;

    fn base() -> Url {
        Url::parse("http://localhost:10000").unwrap()
    }

    fn raw_request(kind: ResultKind) -> AnalysisRequest {
        AnalysisRequest::new(
            ImagePayload::Raw {
                pixels: Bytes::from(vec![0u8; 100 * 50 * 3]),
                width: 100,
                height: 50,
            },
            kind,
        )
    }

    #[test]
    fn raw_heatmap_request_carries_dimensions() {
        let url = encode_url(&base(), None, &raw_request(ResultKind::Heatmap)).unwrap();
        assert_eq!(url.path(), "/analyze_raw_image");
        assert_eq!(url.query(), Some("response_type=heatmap&width=100&height=50"));
    }

    #[test]
    fn file_context_request_has_no_dimensions() {
        let request = AnalysisRequest::new(ImagePayload::File("img.png".into()), ResultKind::Context);
        let url = encode_url(&base(), None, &request).unwrap();
        assert_eq!(url.path(), "/analyze_image");
        assert_eq!(url.query(), Some("response_type=context"));
    }

    #[test]
    fn optional_parameters_follow_response_type() {
        let request = AnalysisRequest::new(
            ImagePayload::Encoded(Bytes::from_static(b"jpeg")),
            ResultKind::AnnotatedImage,
        )
        .with_data(Some("lot 12&line=3"))
        .with_context_in_body(true);

        let url = encode_url(&base(), Some("k3y"), &request).unwrap();
        assert_eq!(
            url.query(),
            Some(
                "response_type=annotated_image&api_key=k3y&data=lot+12%26line%3D3&context_in_body=1"
            )
        );
        let data = url
            .query_pairs()
            .find(|(k, _)| k == "data")
            .map(|(_, v)| v.into_owned());
        assert_eq!(data.as_deref(), Some("lot 12&line=3"));
    }

    #[tokio::test]
    async fn file_body_is_read_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x89PNG\r\n").unwrap();

        let body = load_body(&ImagePayload::File(file.path().to_path_buf()))
            .await
            .unwrap();
        assert_eq!(&body[..], b"\x89PNG\r\n");
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let err = load_body(&ImagePayload::File("/nonexistent/image.png".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Io(_)));
    }
}
