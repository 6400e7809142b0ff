//! Image decoding
//!
//! Turns the raw bytes of an uploaded file into pixels. These functions are
//! CPU-intensive; the staging pipeline calls them from the blocking pool.

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};

/// Decode any format the `image` crate recognizes from its magic bytes
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, image::ImageError> {
    image::load_from_memory(bytes)
}

/// Shrink an image so neither side exceeds `max_dimension`
///
/// Images already within bounds are converted without resampling.
pub fn bounded_rgba(img: &DynamicImage, max_dimension: u32) -> RgbaImage {
    if max_dimension == 0 || (img.width() <= max_dimension && img.height() <= max_dimension) {
        return img.to_rgba8();
    }
    img.resize(max_dimension, max_dimension, FilterType::Triangle).to_rgba8()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    /// Encode a solid-color PNG in memory
    pub(crate) fn png_bytes(width: u32, height: u32, px: Rgba<u8>) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, px);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let bytes = png_bytes(5, 3, Rgba([10, 20, 30, 255]));
        let img = decode_image(&bytes).unwrap().to_rgba8();
        assert_eq!((img.width(), img.height()), (5, 3));
        assert_eq!(img.get_pixel(4, 2), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode_image(b"definitely not an image").is_err());
    }

    #[test]
    fn test_bounded_rgba_shrinks_large_images() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(400, 200));
        let bounded = bounded_rgba(&img, 100);
        assert!(bounded.width() <= 100 && bounded.height() <= 100);

        let small = DynamicImage::ImageRgba8(RgbaImage::new(40, 20));
        assert_eq!(bounded_rgba(&small, 100).dimensions(), (40, 20));
    }
}
