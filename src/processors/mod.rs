//! Image processing for the pix2pix input pipeline.
//!
//! # Modules
//!
//! * `color_codec` - Conversion between annotation colors and class dimension masks
//! * `crop_or_pad` - Center crop-or-pad onto the fixed canvas
//! * `decode` - PNG decoding and 8-bit / float conversion

pub mod color_codec;
pub mod crop_or_pad;
pub mod decode;

pub use color_codec::{
    batch_dimensions_to_colors_list, colors_to_dimensions, combine_image, convert_image,
    dimensions_to_colors_argmax, replace_black_with_white,
};
pub use crop_or_pad::crop_or_pad;
pub use decode::{
    array_to_rgb, decode_png, encode_png, float_to_u8, rgb_to_array, rgb_to_float,
};
