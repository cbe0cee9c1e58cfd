//! Conversion between annotation colors and class dimensions.
//!
//! An annotation image is encoded as a stack of per-class binary masks, one
//! channel per configured color. Predicted masks are decoded back into
//! viewable images by tinting each channel with its class color and adding
//! the tinted images together.

use crate::core::batch::{ImageBatch, Tensor3D, Tensor4D};
use crate::core::config::RgbColor;
use crate::core::errors::{PipelineError, PipelineResult};
use crate::processors::decode::float_to_u8;
use ndarray::{Array3, Array4, ArrayView3, ArrayView4, Axis, Zip};

const WHITE: [u8; 3] = [255, 255, 255];

/// Encodes an `(H, W, 3)` annotation into an `(H, W, colors.len())` mask stack.
///
/// Channel `c` is 1.0 where the pixel equals `colors[c]` exactly and 0.0
/// elsewhere. Pixels matching no color are zero in every channel.
pub fn colors_to_dimensions(image: ArrayView3<'_, u8>, colors: &[RgbColor]) -> Tensor3D {
    let (height, width, _) = image.dim();
    let mut masks = Array3::<f32>::zeros((height, width, colors.len()));

    Zip::from(masks.lanes_mut(Axis(2)))
        .and(image.lanes(Axis(2)))
        .for_each(|mut mask, pixel| {
            for (c, color) in colors.iter().enumerate() {
                if pixel.iter().eq(color.iter()) {
                    mask[c] = 1.0;
                }
            }
        });

    masks
}

/// Splits an `(N, H, W, D)` mask batch into `D` color-weighted `(N, H, W, 3)` images.
///
/// Image `c` is channel `c` repeated over RGB and scaled by `colors[c] / 255`.
///
/// # Errors
///
/// Returns an error if the batch has fewer channels than there are colors.
pub fn batch_dimensions_to_colors_list(
    batch: ArrayView4<'_, f32>,
    colors: &[RgbColor],
) -> PipelineResult<Vec<Tensor4D>> {
    let (n, height, width, channels) = batch.dim();
    if channels < colors.len() {
        return Err(PipelineError::invalid_input(format!(
            "mask batch has {channels} channels but {} colors are configured",
            colors.len()
        )));
    }

    Ok(colors
        .iter()
        .enumerate()
        .map(|(c, color)| {
            let channel = batch.index_axis(Axis(3), c);
            let weights = color.map(|v| v as f32 / 255.0);
            Array4::from_shape_fn((n, height, width, 3), |(i, y, x, k)| {
                channel[[i, y, x]] * weights[k]
            })
        })
        .collect())
}

/// Converts a float image batch to 8 bits, saturating out-of-range values.
pub fn convert_image(batch: ArrayView4<'_, f32>) -> ImageBatch {
    batch.mapv(float_to_u8)
}

/// Replaces every pure black pixel with white.
pub fn replace_black_with_white(batch: &mut ImageBatch) {
    for mut pixel in batch.lanes_mut(Axis(3)) {
        if pixel.iter().all(|&v| v == 0) {
            pixel.iter_mut().zip(WHITE).for_each(|(v, w)| *v = w);
        }
    }
}

/// Adds color-weighted images into one 8-bit composite.
///
/// Overlapping classes add up and saturate rather than taking the maximum.
///
/// # Errors
///
/// Returns an error if `images` is empty or their shapes disagree.
pub fn combine_image(
    images: &[Tensor4D],
    replace_black_with_white_color: bool,
) -> PipelineResult<ImageBatch> {
    let (first, rest) = images
        .split_first()
        .ok_or_else(|| PipelineError::invalid_input("cannot combine an empty list of images"))?;

    let mut sum = first.clone();
    for (i, image) in rest.iter().enumerate() {
        if image.shape() != sum.shape() {
            return Err(PipelineError::invalid_input(format!(
                "cannot combine images of shape {:?} and {:?} (image {})",
                sum.shape(),
                image.shape(),
                i + 1
            )));
        }
        sum += image;
    }

    let mut combined = convert_image(sum.view());
    if replace_black_with_white_color {
        replace_black_with_white(&mut combined);
    }
    Ok(combined)
}

/// Decodes a single `(H, W, D)` mask stack by taking the strongest channel
/// per pixel. Pixels whose channels are all zero decode to black.
pub fn dimensions_to_colors_argmax(masks: ArrayView3<'_, f32>, colors: &[RgbColor]) -> Array3<u8> {
    let (height, width, _) = masks.dim();
    let mut image = Array3::<u8>::zeros((height, width, 3));

    Zip::from(image.lanes_mut(Axis(2)))
        .and(masks.lanes(Axis(2)))
        .for_each(|mut pixel, mask| {
            let best = mask
                .iter()
                .take(colors.len())
                .enumerate()
                .filter(|(_, v)| **v > 0.0)
                .fold(None, |best: Option<(usize, f32)>, (c, &v)| match best {
                    Some((_, bv)) if bv >= v => best,
                    _ => Some((c, v)),
                });
            if let Some((c, _)) = best {
                pixel.iter_mut().zip(colors[c]).for_each(|(p, v)| *p = v);
            }
        });

    image
}
