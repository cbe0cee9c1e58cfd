//! Typed records for each stage of graph construction.
//!
//! Data moves through the graph as:
//!
//! `RawExample` → [`ParsedExample`](crate::pipeline::example::ParsedExample)
//! → `DecodedExample` → `ExampleBatch` → `ModelOutputs` → `GraphReferences`
//!
//! Each stage owns exactly the fields it needs, so nothing is left unset
//! waiting for a later stage to fill it in.

use crate::core::batch::{Tensor3D, Tensor4D, stack_examples};
use crate::core::errors::{PipelineError, PipelineResult};
use crate::utils::visualization::SummaryRegistry;
use std::time::Duration;

/// A serialized example as it enters the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExample {
    /// Source key; `None` for records fed through the placeholder.
    pub key: Option<String>,
    /// The serialized example.
    pub record: Vec<u8>,
}

/// One example after decoding and normalization.
#[derive(Debug, Clone)]
pub struct DecodedExample {
    /// Source key, if any.
    pub key: Option<String>,
    /// URI of the input image.
    pub input_uri: String,
    /// URI of the annotation image.
    pub annotation_uri: String,
    /// Input image, `(H, W, 3)` in `[0, 1]`.
    pub image: Tensor3D,
    /// Annotation image, `(H, W, 3)` in `[0, 1]`.
    pub annotation: Tensor3D,
    /// Training target: the class mask stack `(H, W, D)`, or the annotation
    /// itself when no color map is configured.
    pub target: Tensor3D,
}

/// A fixed-size batch of examples whose tensors advance in lockstep.
///
/// Row `i` of every field comes from the same source record.
#[derive(Debug, Clone)]
pub struct ExampleBatch {
    /// Source keys.
    pub keys: Vec<Option<String>>,
    /// Input image URIs.
    pub input_uris: Vec<String>,
    /// Annotation image URIs.
    pub annotation_uris: Vec<String>,
    /// Input images, `(N, H, W, 3)`.
    pub images: Tensor4D,
    /// Annotation images, `(N, H, W, 3)`.
    pub annotations: Tensor4D,
    /// Targets, `(N, H, W, D)`.
    pub targets: Tensor4D,
    /// Time spent parsing and decoding the batch.
    pub decode_time: Duration,
}

impl ExampleBatch {
    /// Groups decoded examples into one batch, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns an error if `examples` is empty or the examples' tensor shapes
    /// disagree.
    pub fn from_examples(
        examples: Vec<DecodedExample>,
        decode_time: Duration,
    ) -> PipelineResult<Self> {
        if examples.is_empty() {
            return Err(PipelineError::invalid_input("cannot build an empty batch"));
        }

        let images: Vec<_> = examples.iter().map(|e| e.image.view()).collect();
        let annotations: Vec<_> = examples.iter().map(|e| e.annotation.view()).collect();
        let targets: Vec<_> = examples.iter().map(|e| e.target.view()).collect();

        let images = stack_examples("images", &images)?;
        let annotations = stack_examples("annotations", &annotations)?;
        let targets = stack_examples("targets", &targets)?;

        let mut keys = Vec::with_capacity(examples.len());
        let mut input_uris = Vec::with_capacity(examples.len());
        let mut annotation_uris = Vec::with_capacity(examples.len());
        for example in examples {
            keys.push(example.key);
            input_uris.push(example.input_uri);
            annotation_uris.push(example.annotation_uri);
        }

        Ok(Self {
            keys,
            input_uris,
            annotation_uris,
            images,
            annotations,
            targets,
            decode_time,
        })
    }

    /// Returns the number of examples in the batch.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the batch holds no examples.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// What the adversarial model produces for one batch.
#[derive(Debug, Clone)]
pub struct ModelOutputs {
    /// Generator outputs, same shape as the targets.
    pub outputs: Tensor4D,
    /// Discriminator loss.
    pub discrim_loss: f32,
    /// Generator adversarial loss.
    pub gen_loss_gan: f32,
    /// Generator L1 loss.
    pub gen_loss_l1: f32,
    /// Global step after this evaluation.
    pub global_step: u64,
}

/// Everything one run of the graph produced.
#[derive(Debug, Clone)]
pub struct GraphReferences {
    /// The batch that was fed to the model.
    pub batch: ExampleBatch,
    /// The model outputs for the batch.
    pub outputs: ModelOutputs,
    /// Diagnostic images and loss scalars.
    pub summaries: SummaryRegistry,
    /// Values for [`format_metric_values`](crate::pipeline::format_metric_values).
    pub metric_values: Vec<Option<f32>>,
}

impl GraphReferences {
    /// Returns the model predictions.
    pub fn predictions(&self) -> &Tensor4D {
        &self.outputs.outputs
    }

    /// Returns the class probabilities; the generator outputs are used as is.
    pub fn probabilities(&self) -> &Tensor4D {
        &self.outputs.outputs
    }

    /// Returns the annotation images the targets were derived from.
    pub fn class_labels(&self) -> &Tensor4D {
        &self.batch.annotations
    }

    /// Returns the global step reported by the model.
    pub fn global_step(&self) -> u64 {
        self.outputs.global_step
    }
}
