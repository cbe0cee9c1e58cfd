//! Collaborator traits for reading examples and running the adversarial model.
//!
//! The pipeline owns decoding, batching and visualization. Reading records
//! from storage and the generator/discriminator network are supplied by the
//! caller through these traits.

use crate::core::config::ModelArgs;
use crate::core::errors::PipelineResult;
use crate::pipeline::stages::ModelOutputs;
use ndarray::ArrayView4;
use std::path::PathBuf;

/// A serialized example together with the key identifying where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedRecord {
    /// Source key, e.g. `path:line`.
    pub key: String,
    /// The serialized example.
    pub record: Vec<u8>,
}

impl KeyedRecord {
    /// Creates a new keyed record.
    pub fn new(key: impl Into<String>, record: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            record: record.into(),
        }
    }
}

/// An owned, lazy sequence of records.
pub type RecordIter = Box<dyn Iterator<Item = PipelineResult<KeyedRecord>> + Send>;

/// Trait for reading serialized examples from storage.
///
/// Implementations produce one ordered pass over the records of the given
/// paths. Repetition and shuffling are layered on top by the pipeline, which
/// calls `read_pass` again for every pass.
pub trait ExampleReader: Send + Sync {
    /// Opens one pass over the records stored at `paths`, in path order.
    ///
    /// # Errors
    ///
    /// Implementations may fail eagerly (e.g. a path cannot be opened) or
    /// yield errors from the returned iterator.
    fn read_pass(&self, paths: &[PathBuf]) -> PipelineResult<RecordIter>;
}

/// Trait for the pix2pix generator/discriminator pair.
///
/// One call corresponds to one evaluation of the model graph on a batch:
/// the model produces predictions for `inputs`, computes its losses against
/// `targets` and, when `train` is set, applies one optimizer update.
pub trait AdversarialModel {
    /// Runs the model on one batch.
    ///
    /// # Arguments
    ///
    /// * `inputs` - Input images, `(N, H, W, 3)` in `[0, 1]`.
    /// * `targets` - Target masks or images, `(N, H, W, D)`.
    /// * `args` - Model hyper-parameters.
    /// * `train` - Whether to apply the training update.
    fn step(
        &mut self,
        inputs: ArrayView4<'_, f32>,
        targets: ArrayView4<'_, f32>,
        args: &ModelArgs,
        train: bool,
    ) -> PipelineResult<ModelOutputs>;

    /// Hook for post-construction setup, called once before the first step.
    fn initialize(&mut self, _args: &ModelArgs) -> PipelineResult<()> {
        Ok(())
    }
}
