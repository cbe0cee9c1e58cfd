//! Tensor aliases and batching helpers.
//!
//! Image tensors are laid out HWC per example and NHWC per batch.

use crate::core::errors::{PipelineError, PipelineResult};
use ndarray::{ArrayView3, Axis};

/// A 3-dimensional tensor (height, width, channels) of f32 values.
pub type Tensor3D = ndarray::Array3<f32>;

/// A 4-dimensional tensor (batch, height, width, channels) of f32 values.
pub type Tensor4D = ndarray::Array4<f32>;

/// A batch of 8-bit images (batch, height, width, 3).
pub type ImageBatch = ndarray::Array4<u8>;

/// Stacks per-example HWC tensors into one NHWC batch tensor.
///
/// # Arguments
///
/// * `name` - Name of the tensor being stacked, used in error messages.
/// * `tensors` - The per-example tensors, in batch order.
///
/// # Errors
///
/// Returns an error if `tensors` is empty or the shapes disagree.
pub fn stack_examples(name: &str, tensors: &[ArrayView3<'_, f32>]) -> PipelineResult<Tensor4D> {
    if tensors.is_empty() {
        return Err(PipelineError::invalid_input(format!(
            "cannot batch '{name}': no examples"
        )));
    }

    let first_shape = tensors[0].shape();
    if let Some((i, other)) = tensors
        .iter()
        .enumerate()
        .find(|(_, tensor)| tensor.shape() != first_shape)
    {
        return Err(PipelineError::invalid_input(format!(
            "cannot batch '{name}': example 0 has shape {:?} but example {i} has shape {:?}",
            first_shape,
            other.shape()
        )));
    }

    ndarray::stack(Axis(0), tensors)
        .map_err(|e| PipelineError::batching(&format!("failed to stack '{name}'"), e))
}
