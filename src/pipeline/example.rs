//! Serialized example schema.
//!
//! A serialized example is a JSON object with four fields:
//!
//! | field              | type          | required | default |
//! |--------------------|---------------|----------|---------|
//! | `input_uri`        | string        | no       | `""`    |
//! | `annotation_uri`   | string        | no       | `""`    |
//! | `input_image`      | base64 PNG    | yes      |         |
//! | `annotation_image` | base64 PNG    | yes      |         |
//!
//! Anything that does not match this schema is a fatal parse error.

use crate::core::errors::{PipelineError, PipelineResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Field name of the optional input image URI.
pub const INPUT_URI: &str = "input_uri";
/// Field name of the optional annotation image URI.
pub const ANNOTATION_URI: &str = "annotation_uri";
/// Field name of the required encoded input image.
pub const INPUT_IMAGE: &str = "input_image";
/// Field name of the required encoded annotation image.
pub const ANNOTATION_IMAGE: &str = "annotation_image";

#[derive(Serialize, Deserialize)]
struct WireExample {
    #[serde(default)]
    input_uri: String,
    #[serde(default)]
    annotation_uri: String,
    #[serde(default)]
    input_image: Option<String>,
    #[serde(default)]
    annotation_image: Option<String>,
}

/// A serialized example parsed against the schema, images still encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedExample {
    /// URI of the input image, empty if not recorded.
    pub input_uri: String,
    /// URI of the annotation image, empty if not recorded.
    pub annotation_uri: String,
    /// PNG-encoded input image.
    pub input_image: Vec<u8>,
    /// PNG-encoded annotation image.
    pub annotation_image: Vec<u8>,
}

impl ParsedExample {
    /// Creates an example from encoded images with empty URIs.
    pub fn new(input_image: Vec<u8>, annotation_image: Vec<u8>) -> Self {
        Self {
            input_uri: String::new(),
            annotation_uri: String::new(),
            input_image,
            annotation_image,
        }
    }

    /// Sets the input and annotation URIs.
    pub fn with_uris(
        mut self,
        input_uri: impl Into<String>,
        annotation_uri: impl Into<String>,
    ) -> Self {
        self.input_uri = input_uri.into();
        self.annotation_uri = annotation_uri.into();
        self
    }

    /// Parses one serialized example.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Schema` if the record is not a JSON object of
    /// the expected shape, a required image is missing, or an image is not
    /// valid base64.
    pub fn parse(record: &[u8]) -> PipelineResult<Self> {
        let wire: WireExample = serde_json::from_slice(record)
            .map_err(|e| PipelineError::schema_error("<record>", e.to_string()))?;

        Ok(Self {
            input_uri: wire.input_uri,
            annotation_uri: wire.annotation_uri,
            input_image: decode_required(INPUT_IMAGE, wire.input_image)?,
            annotation_image: decode_required(ANNOTATION_IMAGE, wire.annotation_image)?,
        })
    }

    /// Serializes the example as a single-line JSON record.
    pub fn encode(&self) -> PipelineResult<Vec<u8>> {
        let wire = WireExample {
            input_uri: self.input_uri.clone(),
            annotation_uri: self.annotation_uri.clone(),
            input_image: Some(STANDARD.encode(&self.input_image)),
            annotation_image: Some(STANDARD.encode(&self.annotation_image)),
        };
        Ok(serde_json::to_vec(&wire)?)
    }
}

fn decode_required(field: &str, value: Option<String>) -> PipelineResult<Vec<u8>> {
    let encoded =
        value.ok_or_else(|| PipelineError::schema_error(field, "missing required field"))?;
    STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| PipelineError::schema_error(field, format!("invalid base64 payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_missing_uris() {
        let record = br#"{"input_image": "AAEC", "annotation_image": "AwQF"}"#;
        let example = ParsedExample::parse(record).unwrap();

        assert_eq!(example.input_uri, "");
        assert_eq!(example.annotation_uri, "");
        assert_eq!(example.input_image, vec![0, 1, 2]);
        assert_eq!(example.annotation_image, vec![3, 4, 5]);
    }

    #[test]
    fn test_encode_then_parse_keeps_uris() {
        let example = ParsedExample::new(vec![9, 8], vec![7]).with_uris("in.png", "ann.png");
        let parsed = ParsedExample::parse(&example.encode().unwrap()).unwrap();
        assert_eq!(parsed, example);
    }

    #[test]
    fn test_missing_required_image_is_schema_error() {
        let err = ParsedExample::parse(br#"{"input_image": "AAEC"}"#).unwrap_err();
        match err {
            PipelineError::Schema { field, .. } => assert_eq!(field, ANNOTATION_IMAGE),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wrong_field_type_is_schema_error() {
        let record = br#"{"input_uri": 3, "input_image": "", "annotation_image": ""}"#;
        let err = ParsedExample::parse(record).unwrap_err();
        assert!(matches!(err, PipelineError::Schema { .. }));
    }

    #[test]
    fn test_truncated_record_is_schema_error() {
        let err = ParsedExample::parse(br#"{"input_image": "AAEC", "annot"#).unwrap_err();
        assert!(matches!(err, PipelineError::Schema { .. }));
    }

    #[test]
    fn test_invalid_base64_is_schema_error() {
        let record = br#"{"input_image": "***", "annotation_image": ""}"#;
        let err = ParsedExample::parse(record).unwrap_err();
        match err {
            PipelineError::Schema { field, .. } => assert_eq!(field, INPUT_IMAGE),
            other => panic!("unexpected error: {other}"),
        }
    }
}
