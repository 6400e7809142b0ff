//! Dominant color sampling
//!
//! Reduces decoded RGBA pixels to one RGB triple. Each visited pixel is
//! weighted by its alpha, so transparent margins around a sign do not
//! drag the result toward black.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::Rgb;

/// How channel values are averaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingMode {
    /// Arithmetic mean of each channel
    Simple,
    /// Root of the mean of squares; keeps saturated colors from washing out
    #[default]
    Sqrt,
}

/// Sampling errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SampleError {
    /// Image has no pixels
    #[error("Image has no pixels")]
    Empty,

    /// Buffer length does not match the declared dimensions
    #[error("Pixel buffer holds {actual} bytes, expected {expected} for RGBA")]
    Malformed { expected: usize, actual: usize },
}

/// Sample the dominant color of an RGBA buffer
///
/// # Arguments
/// * `pixels` - Row-major RGBA8 data, `width * height * 4` bytes
/// * `step` - Visit every Nth pixel (0 is treated as 1)
///
/// # Returns
/// * The alpha-weighted average color, `(0, 0, 0)` if every visited pixel is fully transparent
pub fn dominant_color(
    pixels: &[u8],
    width: u32,
    height: u32,
    mode: SamplingMode,
    step: usize,
) -> Result<Rgb, SampleError> {
    let pixel_count = width as usize * height as usize;
    if pixel_count == 0 {
        return Err(SampleError::Empty);
    }

    let expected = pixel_count * 4;
    if pixels.len() != expected {
        return Err(SampleError::Malformed {
            expected,
            actual: pixels.len(),
        });
    }

    let mut totals = [0f64; 3];
    let mut alpha_total = 0f64;

    for px in pixels.chunks_exact(4).step_by(step.max(1)) {
        let alpha = f64::from(px[3]) / 255.0;
        if alpha == 0.0 {
            continue;
        }
        for (total, &value) in totals.iter_mut().zip(&px[..3]) {
            let value = f64::from(value);
            *total += match mode {
                SamplingMode::Simple => value * alpha,
                SamplingMode::Sqrt => value * value * alpha,
            };
        }
        alpha_total += alpha;
    }

    if alpha_total == 0.0 {
        return Ok(Rgb::new(0, 0, 0));
    }

    let channel = |total: f64| -> u8 {
        let mean = total / alpha_total;
        let value = match mode {
            SamplingMode::Simple => mean,
            SamplingMode::Sqrt => mean.sqrt(),
        };
        value.round().clamp(0.0, 255.0) as u8
    };

    Ok(Rgb::new(
        channel(totals[0]),
        channel(totals[1]),
        channel(totals[2]),
    ))
}

/// Sample the dominant color of a decoded image
pub fn dominant_color_of(
    image: &RgbaImage,
    mode: SamplingMode,
    step: usize,
) -> Result<Rgb, SampleError> {
    dominant_color(image.as_raw(), image.width(), image.height(), mode, step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_solid_color_is_exact() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([34, 139, 34, 255]));
        for mode in [SamplingMode::Simple, SamplingMode::Sqrt] {
            assert_eq!(dominant_color_of(&img, mode, 1).unwrap(), Rgb::new(34, 139, 34));
        }
    }

    #[test]
    fn test_transparent_pixels_are_ignored() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 1, Rgba([200, 20, 30, 255]));
        let rgb = dominant_color_of(&img, SamplingMode::Sqrt, 1).unwrap();
        assert_eq!(rgb, Rgb::new(200, 20, 30));
    }

    #[test]
    fn test_fully_transparent_image_is_black() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([255, 255, 255, 0]));
        assert_eq!(
            dominant_color_of(&img, SamplingMode::Simple, 1).unwrap(),
            Rgb::new(0, 0, 0)
        );
    }

    #[test]
    fn test_modes_differ_on_mixed_pixels() {
        // Half black, half red
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([200, 0, 0, 255]));

        let simple = dominant_color_of(&img, SamplingMode::Simple, 1).unwrap();
        let sqrt = dominant_color_of(&img, SamplingMode::Sqrt, 1).unwrap();
        assert_eq!(simple, Rgb::new(100, 0, 0));
        // sqrt(200^2 / 2) = 141.42
        assert_eq!(sqrt, Rgb::new(141, 0, 0));
    }

    #[test]
    fn test_step_skips_pixels() {
        // Alternating red/blue row; step 2 only sees red
        let mut img = RgbaImage::new(6, 1);
        for x in 0..6 {
            let px = if x % 2 == 0 { Rgba([255, 0, 0, 255]) } else { Rgba([0, 0, 255, 255]) };
            img.put_pixel(x, 0, px);
        }
        assert_eq!(
            dominant_color_of(&img, SamplingMode::Simple, 2).unwrap(),
            Rgb::new(255, 0, 0)
        );
    }

    #[test]
    fn test_same_input_same_output() {
        let mut img = RgbaImage::new(16, 16);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = Rgba([(x * 13) as u8, (y * 7) as u8, ((x + y) * 5) as u8, 255]);
        }
        let first = dominant_color_of(&img, SamplingMode::Sqrt, 1).unwrap();
        let second = dominant_color_of(&img, SamplingMode::Sqrt, 1).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_buffers() {
        assert_eq!(
            dominant_color(&[], 0, 0, SamplingMode::Sqrt, 1),
            Err(SampleError::Empty)
        );
        assert_eq!(
            dominant_color(&[1, 2, 3], 1, 1, SamplingMode::Sqrt, 1),
            Err(SampleError::Malformed { expected: 4, actual: 3 })
        );
    }
}
