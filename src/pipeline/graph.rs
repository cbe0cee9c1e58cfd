//! Example graph: records in, model-ready batches out.
//!
//! A [`Graph`] is built by [`Model::build_graph`](crate::pipeline::Model::build_graph)
//! and does no work until batches are pulled from it. Each pull takes
//! `batch_size` records from the input, then for every record:
//!
//! 1. parses it against the example schema
//! 2. decodes both PNGs to RGB
//! 3. center crops or pads both images to the model canvas
//! 4. converts the input to `[0, 1]` floats and derives the target, either
//!    the per-class mask stack or the annotation itself
//!
//! The decoded examples are stacked into one [`ExampleBatch`] whose fields
//! stay aligned row by row.

use crate::core::errors::{PipelineError, PipelineResult};
use crate::core::traits::AdversarialModel;
use crate::pipeline::example::{ANNOTATION_IMAGE, INPUT_IMAGE, ParsedExample};
use crate::pipeline::mode::GraphMode;
use crate::pipeline::model::ModelConfig;
use crate::pipeline::reader::ExampleStream;
use crate::pipeline::stages::{DecodedExample, ExampleBatch, GraphReferences, RawExample};
use crate::processors::color_codec::colors_to_dimensions;
use crate::processors::crop_or_pad::crop_or_pad;
use crate::processors::decode::{decode_png, rgb_to_array, rgb_to_float};
use crate::utils::visualization::{SummaryRegistry, add_loss_summaries, add_model_summary_images};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, warn};

/// Where a graph takes its serialized examples from.
pub enum GraphInput {
    /// Records read from data paths.
    Stream(ExampleStream),
    /// Records fed by the caller through [`Graph::feed`].
    Placeholder {
        /// Name of the placeholder.
        name: String,
        /// Records fed but not yet batched.
        queue: VecDeque<Vec<u8>>,
    },
}

/// A lazily evaluated input pipeline for one train, evaluate or predict run.
pub struct Graph<'m> {
    config: &'m ModelConfig,
    mode: GraphMode,
    batch_size: usize,
    input: GraphInput,
}

impl<'m> Graph<'m> {
    pub(crate) fn new(
        config: &'m ModelConfig,
        input: GraphInput,
        mode: GraphMode,
        batch_size: usize,
    ) -> Self {
        Self {
            config,
            mode,
            batch_size,
            input,
        }
    }

    /// Returns the mode the graph was built for.
    pub fn mode(&self) -> GraphMode {
        self.mode
    }

    /// Returns the batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Returns the placeholder name if the graph takes fed records.
    pub fn placeholder_name(&self) -> Option<&str> {
        match &self.input {
            GraphInput::Placeholder { name, .. } => Some(name),
            GraphInput::Stream(_) => None,
        }
    }

    /// Feeds one serialized example into the placeholder.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph reads from data paths instead.
    pub fn feed(&mut self, record: impl Into<Vec<u8>>) -> PipelineResult<()> {
        match &mut self.input {
            GraphInput::Placeholder { queue, .. } => {
                queue.push_back(record.into());
                Ok(())
            }
            GraphInput::Stream(_) => Err(PipelineError::invalid_input(
                "graph reads from data paths and has no input placeholder",
            )),
        }
    }

    /// Takes the records for the next batch.
    ///
    /// A stream that ends part-way through a batch drops the remainder.
    /// A placeholder yields whatever has been fed, up to `batch_size`.
    pub fn next_raw_batch(&mut self) -> Option<PipelineResult<Vec<RawExample>>> {
        let batch_size = self.batch_size;
        match &mut self.input {
            GraphInput::Stream(stream) => {
                let mut raw = Vec::with_capacity(batch_size);
                while raw.len() < batch_size {
                    match stream.next() {
                        Some(Ok(record)) => raw.push(RawExample {
                            key: Some(record.key),
                            record: record.record,
                        }),
                        Some(Err(e)) => return Some(Err(e)),
                        None => {
                            if !raw.is_empty() {
                                debug!("dropping {} record(s) short of a full batch", raw.len());
                            }
                            return None;
                        }
                    }
                }
                Some(Ok(raw))
            }
            GraphInput::Placeholder { queue, .. } => {
                if queue.is_empty() {
                    return None;
                }
                let take = batch_size.min(queue.len());
                Some(Ok(queue
                    .drain(..take)
                    .map(|record| RawExample { key: None, record })
                    .collect()))
            }
        }
    }

    /// Pulls, decodes and stacks the next batch.
    ///
    /// Returns `None` once the input is exhausted: never for a training
    /// stream, after two passes for evaluation and prediction streams, and
    /// when nothing is left to batch for a placeholder.
    pub fn next_batch(&mut self) -> Option<PipelineResult<ExampleBatch>> {
        let raw = match self.next_raw_batch()? {
            Ok(raw) => raw,
            Err(e) => return Some(Err(e)),
        };
        Some(self.decode_batch(raw))
    }

    fn decode_batch(&self, raw: Vec<RawExample>) -> PipelineResult<ExampleBatch> {
        let start = Instant::now();
        let config = self.config;

        let examples = if raw.len() > config.parallel_threshold {
            use rayon::prelude::*;
            raw.into_par_iter()
                .map(|example| decode_example(example, config))
                .collect::<PipelineResult<Vec<_>>>()?
        } else {
            raw.into_iter()
                .map(|example| decode_example(example, config))
                .collect::<PipelineResult<Vec<_>>>()?
        };

        let batch = ExampleBatch::from_examples(examples, start.elapsed())?;
        debug!(
            "decoded batch of {} in {:?}: images {:?}, targets {:?}",
            batch.len(),
            batch.decode_time,
            batch.images.shape(),
            batch.targets.shape()
        );
        Ok(batch)
    }

    /// Runs the model on the next batch.
    ///
    /// # Returns
    ///
    /// `Ok(None)` once the input is exhausted.
    pub fn run<M: AdversarialModel + ?Sized>(
        &mut self,
        model: &mut M,
    ) -> PipelineResult<Option<GraphReferences>> {
        match self.next_batch() {
            Some(batch) => self.run_batch(batch?, model).map(Some),
            None => Ok(None),
        }
    }

    /// Runs the model on a batch and assembles its summaries.
    ///
    /// # Errors
    ///
    /// Returns an error if the model fails or its outputs do not have the
    /// shape of the targets.
    pub fn run_batch<M: AdversarialModel + ?Sized>(
        &self,
        batch: ExampleBatch,
        model: &mut M,
    ) -> PipelineResult<GraphReferences> {
        let outputs = model.step(
            batch.images.view(),
            batch.targets.view(),
            &self.config.args,
            self.mode.applies_updates(),
        )?;

        if outputs.outputs.shape() != batch.targets.shape() {
            warn!(
                "model returned outputs of shape {:?} for targets of shape {:?}",
                outputs.outputs.shape(),
                batch.targets.shape()
            );
            return Err(PipelineError::invalid_input(format!(
                "model outputs have shape {:?} but targets have shape {:?}",
                outputs.outputs.shape(),
                batch.targets.shape()
            )));
        }

        let mut summaries = SummaryRegistry::new();
        add_model_summary_images(
            &mut summaries,
            &batch,
            &outputs.outputs,
            self.config.dimensions.as_ref(),
        )?;
        add_loss_summaries(&mut summaries, &outputs);

        let metric_values = vec![Some(outputs.discrim_loss)];
        Ok(GraphReferences {
            batch,
            outputs,
            summaries,
            metric_values,
        })
    }
}

impl Iterator for Graph<'_> {
    type Item = PipelineResult<ExampleBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch()
    }
}

/// Decodes one serialized example into model-ready tensors.
///
/// # Errors
///
/// Returns an error if the record violates the schema or an image is not a
/// valid PNG.
pub fn decode_example(raw: RawExample, config: &ModelConfig) -> PipelineResult<DecodedExample> {
    let parsed = ParsedExample::parse(&raw.record)?;
    let (width, height) = (config.image_width, config.image_height);

    let input = crop_or_pad(&decode_png(INPUT_IMAGE, &parsed.input_image)?, width, height);
    let annotation = crop_or_pad(
        &decode_png(ANNOTATION_IMAGE, &parsed.annotation_image)?,
        width,
        height,
    );

    let image = rgb_to_float(&input);
    let annotation_tensor = rgb_to_float(&annotation);
    let target = match &config.dimensions {
        Some(dimensions) => {
            colors_to_dimensions(rgb_to_array(&annotation).view(), &dimensions.colors)
        }
        None => annotation_tensor.clone(),
    };

    Ok(DecodedExample {
        key: raw.key,
        input_uri: parsed.input_uri,
        annotation_uri: parsed.annotation_uri,
        image,
        annotation: annotation_tensor,
        target,
    })
}
