use std::io::Cursor;

use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::PrivacyError;

/// Blur parameters for the public evidence copy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskConfig {
    /// Gaussian blur sigma. High enough that text and faces are not
    /// recoverable from the public copy.
    #[serde(default = "MaskConfig::default_blur_sigma")]
    pub blur_sigma: f32,
}

impl MaskConfig {
    pub(crate) fn default_blur_sigma() -> f32 {
        12.0
    }
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            blur_sigma: Self::default_blur_sigma(),
        }
    }
}

/// Produce the irreversibly blurred public copy of an evidence image.
///
/// Decodes, blurs and re-encodes as JPEG. Any failure is an error for the
/// caller to handle by withholding the public copy; this function never
/// hands back the input bytes as a fallback.
pub fn mask_image(bytes: &[u8], cfg: &MaskConfig) -> Result<Vec<u8>, PrivacyError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| PrivacyError::Mask(e.to_string()))?;

    // JPEG output has no alpha channel; flatten first.
    let blurred = image::DynamicImage::ImageRgb8(decoded.to_rgb8()).blur(cfg.blur_sigma);

    let mut out = Cursor::new(Vec::new());
    blurred
        .write_to(&mut out, ImageFormat::Jpeg)
        .map_err(|e| PrivacyError::Mask(e.to_string()))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// A small synthetic photo with a hard edge, so blurring has something
    /// measurable to destroy.
    fn test_png() -> Vec<u8> {
        let mut img = RgbImage::new(64, 64);
        for (x, _y, pixel) in img.enumerate_pixels_mut() {
            *pixel = if x < 32 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            };
        }
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn masking_produces_a_decodable_jpeg() {
        let masked = mask_image(&test_png(), &MaskConfig::default()).unwrap();
        let decoded = image::load_from_memory(&masked).unwrap();
        assert_eq!(decoded.width(), 64);
        assert_eq!(decoded.height(), 64);
    }

    #[test]
    fn masking_blurs_the_hard_edge() {
        let masked = mask_image(&test_png(), &MaskConfig::default()).unwrap();
        let decoded = image::load_from_memory(&masked).unwrap().to_rgb8();
        // The centre column sat on a white/black boundary; after a strong
        // blur it must be grey, not either extreme.
        let centre = decoded.get_pixel(32, 32);
        assert!(centre[0] > 40 && centre[0] < 215, "centre not blurred: {centre:?}");
    }

    #[test]
    fn garbage_bytes_fail_instead_of_passing_through() {
        let garbage = b"definitely not an image";
        let result = mask_image(garbage, &MaskConfig::default());
        assert!(matches!(result, Err(PrivacyError::Mask(_))));
    }
}
