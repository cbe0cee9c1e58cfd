//! # OAR pix2pix
//!
//! The input pipeline of a pix2pix model that translates document images into
//! color-coded annotation images.
//!
//! ## Features
//!
//! - Paired examples read from JSON Lines files or fed one at a time
//! - PNG decoding with center crop-or-pad to a fixed 256×256 canvas
//! - Annotation colors encoded as per-class mask stacks, and decoded back
//! - Lockstep batching of inputs, annotations and targets
//! - Diagnostic images with per-class and combined composites
//!
//! ## Components
//!
//! - **Color-dimension codec**: convert between annotation colors and class channels
//! - **Example graph**: read, decode, normalize and batch examples
//! - **Visualization**: named diagnostic images in a single registry
//! - **Model facade**: configuration and train/evaluate/predict graphs
//!
//! ## Modules
//!
//! * [`core`] - Errors, configuration, tensor aliases and collaborator traits
//! * [`pipeline`] - Example schema, readers, graphs and the model facade
//! * [`processors`] - Image decoding, crop-or-pad and the color codec
//! * [`utils`] - Diagnostic images and logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oar_pix2pix::prelude::*;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Flags the model does not own are handed back to the caller
//! let (model, remaining) = create_model(["--color_map", "color_map.conf", "--job-dir", "out"])?;
//! println!("driver flags: {remaining:?}");
//!
//! let mut graph = model.build_eval_graph(&[PathBuf::from("eval.jsonl")], 8)?;
//! while let Some(batch) = graph.next_batch() {
//!     let batch = batch?;
//!     println!("{} examples, targets {:?}", batch.len(), batch.targets.shape());
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use oar_pix2pix::prelude::*;
/// ```
///
/// Included items cover building a model and pulling batches. For the codec,
/// readers and visualization helpers, import from the respective modules.
pub mod prelude {
    pub use crate::core::{
        AdversarialModel, DimensionSpec, ExampleReader, ModelArgs, PipelineError, PipelineResult,
    };
    pub use crate::pipeline::{
        ExampleBatch, Graph, GraphMode, GraphReferences, Model, ModelOutputs, create_model,
        format_metric_values,
    };
    pub use crate::utils::{SummaryRegistry, init_tracing};
}
