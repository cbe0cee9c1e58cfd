//! Error types for the pix2pix input pipeline.
//!
//! This module defines the errors that can occur while reading serialized
//! examples, decoding images, batching and assembling diagnostic images. It also provides
//! helper constructors for creating these errors with appropriate context.

use thiserror::Error;

/// Enum representing the stages of the pipeline an error can originate from.
///
/// This enum is used to identify which stage of the pipeline an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Error occurred while decoding an encoded image.
    Decode,
    /// Error occurred while grouping examples into a batch.
    Batching,
    /// Error occurred while assembling diagnostic images.
    Visualization,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Decode => write!(f, "decode"),
            ProcessingStage::Batching => write!(f, "batching"),
            ProcessingStage::Visualization => write!(f, "visualization"),
        }
    }
}

/// Enum representing the errors that can occur in the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error occurred while decoding or encoding an image.
    #[error("image codec")]
    Image(#[source] image::ImageError),

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A serialized example does not match the example schema.
    #[error("example schema violation in field '{field}': {message}")]
    Schema {
        /// The schema field that failed to parse.
        field: String,
        /// A message describing the violation.
        message: String,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error from record (de)serialization.
    #[error("record serialization")]
    Json(#[from] serde_json::Error),

    /// Error from command-line argument parsing.
    #[error(transparent)]
    Args(#[from] clap::Error),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

/// Convenient result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Creates a processing error for the given stage.
    ///
    /// # Arguments
    ///
    /// * `kind` - The stage of processing where the error occurred.
    /// * `context` - Additional context about the error.
    /// * `error` - The underlying error that caused this error.
    pub fn processing_error(
        kind: ProcessingStage,
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a processing error for tensor shape failures while batching.
    pub fn batching(context: &str, error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::processing_error(ProcessingStage::Batching, context, error)
    }

    /// Creates a decode error for an image field of an example.
    ///
    /// # Arguments
    ///
    /// * `field` - The example field holding the encoded image.
    /// * `error` - The underlying image error.
    pub fn decode_error(field: &str, error: image::ImageError) -> Self {
        Self::processing_error(
            ProcessingStage::Decode,
            format!("failed to decode PNG in field '{field}'"),
            error,
        )
    }

    /// Creates a schema violation error.
    pub fn schema_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates a configuration error that names the offending field and value.
    ///
    /// # Arguments
    ///
    /// * `field` - The configuration field.
    /// * `value` - The rejected value.
    /// * `reason` - Why the value was rejected.
    pub fn config_error_with_context(field: &str, value: &str, reason: &str) -> Self {
        Self::ConfigError {
            message: format!("invalid value '{value}' for '{field}': {reason}"),
        }
    }
}

impl From<image::ImageError> for PipelineError {
    fn from(error: image::ImageError) -> Self {
        Self::Image(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_error_display_names_stage() {
        let error = PipelineError::batching(
            "stack input images",
            std::io::Error::new(std::io::ErrorKind::InvalidData, "shape"),
        );
        assert_eq!(error.to_string(), "batching failed: stack input images");
    }

    #[test]
    fn test_decode_error_names_field() {
        let error = PipelineError::decode_error(
            "annotation_image",
            image::ImageError::IoError(std::io::Error::other("truncated")),
        );
        assert!(matches!(
            error,
            PipelineError::Processing {
                kind: ProcessingStage::Decode,
                ..
            }
        ));
        assert_eq!(
            error.to_string(),
            "decode failed: failed to decode PNG in field 'annotation_image'"
        );
    }

    #[test]
    fn test_schema_error_display() {
        let error = PipelineError::schema_error("input_image", "missing required field");
        assert_eq!(
            error.to_string(),
            "example schema violation in field 'input_image': missing required field"
        );
    }

    #[test]
    fn test_config_error_with_context() {
        let error = PipelineError::config_error_with_context("color_map", "(1,2)", "not a color");
        assert!(matches!(error, PipelineError::ConfigError { .. }));
        assert!(error.to_string().contains("'(1,2)'"));
    }
}
