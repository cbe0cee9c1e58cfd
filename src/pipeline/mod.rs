//! The pix2pix input pipeline.
//!
//! This module turns serialized paired examples into model-ready batches and
//! runs the adversarial model on them. [`Model`] is the entry point: it holds
//! the configuration and builds a [`Graph`] per train, evaluate or predict run.

pub mod example;
pub mod graph;
pub mod mode;
pub mod model;
pub mod reader;
pub mod stages;

pub use example::ParsedExample;
pub use graph::{Graph, GraphInput, decode_example};
pub use mode::GraphMode;
pub use model::{Model, ModelConfig, create_model, format_metric_values};
pub use reader::{
    BoundedOrdered, ExampleStream, JsonLinesReader, MemoryReader, ReadPolicy, RepeatingShuffled,
};
pub use stages::{DecodedExample, ExampleBatch, GraphReferences, ModelOutputs, RawExample};
