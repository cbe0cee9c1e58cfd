//! Center crop-or-pad onto a fixed canvas.
//!
//! Each axis is handled independently: a larger side is cropped around its
//! center, a smaller side is centered on a black canvas. Pixels are copied
//! unchanged, so annotation colors survive exactly.

use image::{RgbImage, imageops};

/// Resizes an image to `target_width` x `target_height` by center cropping
/// and/or zero padding, without interpolation.
///
/// When the difference along an axis is odd, the extra row or column is
/// taken from (or added to) the bottom/right side.
pub fn crop_or_pad(image: &RgbImage, target_width: u32, target_height: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    if (width, height) == (target_width, target_height) {
        return image.clone();
    }

    let crop_x = width.saturating_sub(target_width) / 2;
    let crop_y = height.saturating_sub(target_height) / 2;
    let pad_x = target_width.saturating_sub(width) / 2;
    let pad_y = target_height.saturating_sub(height) / 2;

    let kept = imageops::crop_imm(
        image,
        crop_x,
        crop_y,
        width.min(target_width),
        height.min(target_height),
    )
    .to_image();

    let mut canvas = RgbImage::new(target_width, target_height);
    imageops::replace(&mut canvas, &kept, pad_x as i64, pad_y as i64);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn indexed(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 1]))
    }

    #[test]
    fn test_same_size_is_unchanged() {
        let image = indexed(4, 3);
        assert_eq!(crop_or_pad(&image, 4, 3), image);
    }

    #[test]
    fn test_crop_keeps_center() {
        let cropped = crop_or_pad(&indexed(6, 6), 2, 2);
        assert_eq!(cropped.dimensions(), (2, 2));
        assert_eq!(cropped.get_pixel(0, 0).0, [2, 2, 1]);
        assert_eq!(cropped.get_pixel(1, 1).0, [3, 3, 1]);
    }

    #[test]
    fn test_pad_centers_on_black() {
        let padded = crop_or_pad(&indexed(2, 2), 4, 4);
        assert_eq!(padded.dimensions(), (4, 4));
        assert_eq!(padded.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(padded.get_pixel(1, 1).0, [0, 0, 1]);
        assert_eq!(padded.get_pixel(2, 2).0, [1, 1, 1]);
        assert_eq!(padded.get_pixel(3, 3).0, [0, 0, 0]);
    }

    #[test]
    fn test_crop_one_axis_pad_the_other() {
        let out = crop_or_pad(&indexed(5, 1), 3, 3);
        assert_eq!(out.dimensions(), (3, 3));
        // row 1 holds the single source row, cropped from x = 1
        assert_eq!(out.get_pixel(0, 1).0, [1, 0, 1]);
        assert_eq!(out.get_pixel(2, 1).0, [3, 0, 1]);
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(2, 2).0, [0, 0, 0]);
    }

    #[test]
    fn test_odd_padding_puts_extra_on_bottom_right() {
        let padded = crop_or_pad(&indexed(1, 1), 4, 4);
        assert_eq!(padded.get_pixel(1, 1).0, [0, 0, 1]);
        assert_eq!(padded.get_pixel(2, 2).0, [0, 0, 0]);
    }
}
