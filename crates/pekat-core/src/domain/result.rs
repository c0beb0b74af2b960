//! Result kinds and analysis results.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of output requested from the analysis server.
///
/// Serialized (and sent over the wire) as `context`, `annotated_image` or
/// `heatmap`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    /// Only the JSON context.
    #[default]
    Context,
    /// The input image with detections drawn on it.
    AnnotatedImage,
    /// A heatmap image.
    Heatmap,
}

impl ResultKind {
    /// All result kinds, in declaration order.
    pub const ALL: [Self; 3] = [Self::Context, Self::AnnotatedImage, Self::Heatmap];

    /// Value of the `response_type` query parameter for this kind.
    pub const fn as_wire_str(self) -> &'static str {
        match self {
            Self::Context => "context",
            Self::AnnotatedImage => "annotated_image",
            Self::Heatmap => "heatmap",
        }
    }

    /// Whether the server answers this kind with image bytes.
    pub const fn returns_image(self) -> bool {
        !matches!(self, Self::Context)
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

/// Error returned when parsing an unknown result kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown result kind '{0}' (expected context, annotated_image or heatmap)")]
pub struct UnknownResultKind(pub String);

impl FromStr for ResultKind {
    type Err = UnknownResultKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_wire_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownResultKind(s.to_string()))
    }
}

/// Outcome of one analysis call.
///
/// Constructed only through [`AnalysisResult::context_only`] and
/// [`AnalysisResult::with_image`]; a `Context` result never carries an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    kind: ResultKind,
    context: Option<String>,
    image: Option<Bytes>,
}

impl AnalysisResult {
    /// A result that carries context text and no image.
    pub fn context_only(kind: ResultKind, context: impl Into<String>) -> Self {
        Self {
            kind,
            context: Some(context.into()),
            image: None,
        }
    }

    /// A result carrying image bytes and, optionally, context text.
    ///
    /// Falls back to [`AnalysisResult::context_only`] semantics for
    /// [`ResultKind::Context`], which never carries an image.
    pub fn with_image(kind: ResultKind, image: Bytes, context: Option<String>) -> Self {
        Self {
            kind,
            context,
            image: kind.returns_image().then_some(image),
        }
    }

    pub const fn kind(&self) -> ResultKind {
        self.kind
    }

    /// Context JSON text, if the server returned any.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Image bytes, if the server returned any.
    pub fn image(&self) -> Option<&[u8]> {
        self.image.as_deref()
    }

    /// Parse the context text as JSON.
    ///
    /// Returns `None` when there is no context.
    pub fn context_json(&self) -> Option<serde_json::Result<serde_json::Value>> {
        self.context.as_deref().map(serde_json::from_str)
    }

    /// Split into `(kind, context, image)`.
    pub fn into_parts(self) -> (ResultKind, Option<String>, Option<Bytes>) {
        (self.kind, self.context, self.image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_match_server_names() {
        assert_eq!(ResultKind::Context.as_wire_str(), "context");
        assert_eq!(ResultKind::AnnotatedImage.as_wire_str(), "annotated_image");
        assert_eq!(ResultKind::Heatmap.as_wire_str(), "heatmap");
    }

    #[test]
    fn parse_accepts_every_wire_string() {
        for kind in ResultKind::ALL {
            assert_eq!(kind.to_string().parse::<ResultKind>(), Ok(kind));
        }
        assert_eq!("HEATMAP".parse::<ResultKind>(), Ok(ResultKind::Heatmap));
        assert!("mask".parse::<ResultKind>().is_err());
    }

    #[test]
    fn serde_uses_wire_strings() {
        let json = serde_json::to_string(&ResultKind::AnnotatedImage).unwrap();
        assert_eq!(json, "\"annotated_image\"");
        let kind: ResultKind = serde_json::from_str("\"heatmap\"").unwrap();
        assert_eq!(kind, ResultKind::Heatmap);
    }

    #[test]
    fn default_kind_is_context() {
        assert_eq!(ResultKind::default(), ResultKind::Context);
    }

    #[test]
    fn context_kind_never_carries_image() {
        let result = AnalysisResult::with_image(
            ResultKind::Context,
            Bytes::from_static(b"png"),
            Some("{}".into()),
        );
        assert!(result.image().is_none());
        assert_eq!(result.context(), Some("{}"));
    }

    #[test]
    fn context_json_parses_text() {
        let result = AnalysisResult::context_only(ResultKind::Context, r#"{"result":true}"#);
        let value = result.context_json().unwrap().unwrap();
        assert_eq!(value["result"], serde_json::Value::Bool(true));

        let image_only =
            AnalysisResult::with_image(ResultKind::Heatmap, Bytes::from_static(b"x"), None);
        assert!(image_only.context_json().is_none());
    }
}
