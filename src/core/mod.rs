//! The core module of the pipeline.
//!
//! This module contains the fundamental components shared by every stage:
//! - Tensor aliases and batching helpers
//! - Configuration: model arguments and the color map
//! - Constants used throughout the pipeline
//! - Error handling
//! - Traits for the example reader and adversarial model collaborators

pub mod batch;
pub mod config;
pub mod constants;
pub mod errors;
pub mod traits;

pub use batch::{ImageBatch, Tensor3D, Tensor4D, stack_examples};
pub use config::{ColorMap, DimensionSpec, ModelArgs, RgbColor};
pub use constants::*;
pub use errors::{PipelineError, PipelineResult, ProcessingStage};
pub use traits::{AdversarialModel, ExampleReader, KeyedRecord, RecordIter};
