//! Tool requests read from named parameters.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::PageSelection;
use crate::error::{Error, Result};
use crate::extract::{ImageFormat, Quality};

/// Parameters of `parse_paper`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseRequest {
    /// Image directory, overriding the configured default
    pub output_dir: Option<PathBuf>,
    /// Image tier, overriding the configured default
    pub quality: Option<Quality>,
    /// Image encoding, overriding the configured default
    pub image_format: Option<ImageFormat>,
    /// Whether images are extracted at all
    pub extract_images: bool,
    /// Zero-based pages; omitted means all
    pub pages: PageSelection,
    /// Character budget of the returned text
    pub max_chars: Option<usize>,
    /// Save the full text here and return a preview
    pub save_text_to: Option<PathBuf>,
    /// Also return each compressed image as base64
    pub return_base64: bool,
}

impl Default for ParseRequest {
    fn default() -> Self {
        Self {
            output_dir: None,
            quality: None,
            image_format: None,
            extract_images: true,
            pages: PageSelection::All,
            max_chars: None,
            save_text_to: None,
            return_base64: false,
        }
    }
}

/// Parameters of `extract_text_only`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextRequest {
    /// Zero-based pages; omitted means all
    pub pages: PageSelection,
    /// Character budget of the returned text
    pub max_chars: Option<usize>,
    /// Save the full text here and return a preview
    pub save_to: Option<PathBuf>,
}

/// Parameters of `extract_images_only`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageRequest {
    /// Image directory, overriding the configured default
    pub output_dir: Option<PathBuf>,
    /// Image tier, overriding the configured default
    pub quality: Option<Quality>,
    /// Image encoding, overriding the configured default
    pub image_format: Option<ImageFormat>,
    /// Zero-based pages; omitted means all
    pub pages: PageSelection,
    /// Also return each compressed image as base64
    pub return_base64: bool,
}

impl From<Option<Vec<usize>>> for TextRequest {
    fn from(pages: Option<Vec<usize>>) -> Self {
        TextRequest {
            pages: PageSelection::from(pages),
            ..Default::default()
        }
    }
}

macro_rules! impl_request {
    ($($ty:ty),*) => {$(
        impl $ty {
            /// Read the request from a JSON object of named parameters.
            ///
            /// Unknown parameters are rejected. An unknown `quality` or
            /// `image_format` fails with its own error kind.
            pub fn from_json(json: &str) -> Result<Self> {
                let value: Value = serde_json::from_str(json).map_err(invalid_request)?;
                from_value(value)
            }

            /// Read `pdf_path` and the request from a tool argument object.
            pub fn from_tool_arguments(json: &str) -> Result<(PathBuf, Self)> {
                let value: Value = serde_json::from_str(json).map_err(invalid_request)?;
                let (path, rest) = take_pdf_path(value)?;
                Ok((path, from_value(rest)?))
            }
        }
    )*};
}

impl_request!(ParseRequest, TextRequest, ImageRequest);

fn invalid_request(err: serde_json::Error) -> Error {
    Error::InvalidRequest(err.to_string())
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    if let Some(quality) = value.get("quality").and_then(Value::as_str) {
        quality.parse::<Quality>()?;
    }
    if let Some(format) = value.get("image_format").and_then(Value::as_str) {
        format.parse::<ImageFormat>()?;
    }
    serde_json::from_value(value).map_err(invalid_request)
}

fn take_pdf_path(value: Value) -> Result<(PathBuf, Value)> {
    let Value::Object(mut map) = value else {
        return Err(Error::InvalidRequest(
            "tool arguments must be a JSON object".to_string(),
        ));
    };
    match map.remove("pdf_path") {
        Some(Value::String(path)) if !path.is_empty() => Ok((PathBuf::from(path), Value::Object(map))),
        Some(_) => Err(Error::InvalidRequest(
            "pdf_path must be a non-empty string".to_string(),
        )),
        None => Err(Error::InvalidRequest("missing field `pdf_path`".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_request_defaults() {
        let request = ParseRequest::from_json("{}").unwrap();
        assert_eq!(request, ParseRequest::default());
        assert!(request.extract_images);
        assert_eq!(request.pages, PageSelection::All);
    }

    #[test]
    fn test_parse_request_fields() {
        let request = ParseRequest::from_json(
            r#"{"quality": "low", "image_format": "png", "extract_images": false,
                "pages": [2, 0], "max_chars": 500, "save_text_to": "/tmp/p.md"}"#,
        )
        .unwrap();
        assert_eq!(request.quality, Some(Quality::Low));
        assert_eq!(request.image_format, Some(ImageFormat::Png));
        assert!(!request.extract_images);
        assert_eq!(request.pages, PageSelection::Pages(vec![0, 2]));
        assert_eq!(request.max_chars, Some(500));
        assert_eq!(request.save_text_to, Some(PathBuf::from("/tmp/p.md")));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = TextRequest::from_json(r#"{"page": [1]}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_unknown_quality_has_own_error() {
        let err = ImageRequest::from_json(r#"{"quality": "ultra"}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidQuality(ref q) if q == "ultra"));

        let err = ImageRequest::from_json(r#"{"image_format": "gif"}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidImageFormat(_)));
    }

    #[test]
    fn test_negative_page_rejected() {
        let err = TextRequest::from_json(r#"{"pages": [-1]}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_return_base64_accepted() {
        let (_, request) =
            ParseRequest::from_tool_arguments(r#"{"pdf_path": "x.pdf", "return_base64": true}"#)
                .unwrap();
        assert!(request.return_base64);

        let request = ImageRequest::from_json(r#"{"return_base64": true}"#).unwrap();
        assert!(request.return_base64);
        assert!(!ImageRequest::default().return_base64);
    }

    #[test]
    fn test_tool_arguments_split_path() {
        let (path, request) =
            TextRequest::from_tool_arguments(r#"{"pdf_path": "paper.pdf", "max_chars": 10}"#)
                .unwrap();
        assert_eq!(path, PathBuf::from("paper.pdf"));
        assert_eq!(request.max_chars, Some(10));

        let err = TextRequest::from_tool_arguments(r#"{"max_chars": 10}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }
}
