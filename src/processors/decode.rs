//! PNG decoding and dtype conversion between 8-bit images and f32 tensors.
//!
//! Float tensors hold intensities in `[0, 1]`. Converting back to 8 bits uses
//! the saturating convention `clamp(trunc(x * 255.5), 0, 255)`.

use crate::core::batch::Tensor3D;
use crate::core::errors::{PipelineError, PipelineResult};
use image::{ImageFormat, RgbImage};
use ndarray::Array3;

/// Decodes PNG bytes into an RGB image, dropping any alpha channel.
///
/// # Arguments
///
/// * `field` - The example field the bytes came from, used in error messages.
/// * `bytes` - The encoded PNG.
pub fn decode_png(field: &str, bytes: &[u8]) -> PipelineResult<RgbImage> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| PipelineError::decode_error(field, e))?;
    Ok(image.to_rgb8())
}

/// Converts an RGB image into an `(H, W, 3)` array of its raw channel values.
pub fn rgb_to_array(image: &RgbImage) -> Array3<u8> {
    let (width, height) = image.dimensions();
    Array3::from_shape_fn((height as usize, width as usize, 3), |(y, x, c)| {
        image.get_pixel(x as u32, y as u32)[c]
    })
}

/// Converts an RGB image into an `(H, W, 3)` f32 tensor with values in `[0, 1]`.
pub fn rgb_to_float(image: &RgbImage) -> Tensor3D {
    rgb_to_array(image).mapv(|v| v as f32 / 255.0)
}

/// Converts a float intensity to 8 bits, saturating out-of-range values.
#[inline]
pub fn float_to_u8(value: f32) -> u8 {
    (value * 255.5).clamp(0.0, 255.0) as u8
}

/// Converts an `(H, W, 3)` 8-bit array back into an RGB image.
///
/// # Errors
///
/// Returns an error if the array does not have three channels.
pub fn array_to_rgb(array: ndarray::ArrayView3<'_, u8>) -> PipelineResult<RgbImage> {
    let (height, width, channels) = array.dim();
    if channels != 3 {
        return Err(PipelineError::invalid_input(format!(
            "expected 3 channels to build an RGB image, got {channels}"
        )));
    }
    Ok(RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        image::Rgb([array[[y, x, 0]], array[[y, x, 1]], array[[y, x, 2]]])
    }))
}

/// Encodes an RGB image as PNG bytes.
pub fn encode_png(image: &RgbImage) -> PipelineResult<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}
