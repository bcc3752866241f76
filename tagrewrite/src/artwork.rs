//! Cover image normalization: any supported image in, a bounded JPEG out.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError};
use log::debug;

use crate::data::CoverArt;
use crate::{Error, Result};

pub const DEFAULT_MAX_DIMENSION: u32 = 800;
pub const DEFAULT_QUALITY: u8 = 90;

/// Size and quality bounds for embedded covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverOptions {
    /// Longest allowed edge in pixels. Larger images are scaled down, smaller ones kept.
    pub max_dimension: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
}

impl Default for CoverOptions {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            quality: DEFAULT_QUALITY,
        }
    }
}

/// Decodes `data`, fits it within `options.max_dimension` and re-encodes it as JPEG.
///
/// # Errors
/// Returns [`Error::InvalidImageFormat`] when `data` is not an image this crate
/// can decode, or [`Error::Image`] if re-encoding fails.
pub fn normalize_cover(data: &[u8], options: &CoverOptions) -> Result<CoverArt> {
    let img = image::load_from_memory(data).map_err(|e| match e {
        ImageError::Unsupported(_) | ImageError::Decoding(_) => Error::InvalidImageFormat,
        e => Error::Image(e),
    })?;

    let max = options.max_dimension.max(1);
    let img = if img.width() > max || img.height() > max {
        debug!(
            "Scaling cover from {}x{} to fit {max}px",
            img.width(),
            img.height()
        );
        img.resize(max, max, FilterType::Lanczos3)
    } else {
        img
    };

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut out), options.quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)?;

    Ok(CoverArt::jpeg(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([0, 128, 255, 100])));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn large_image_is_bounded() {
        let cover = normalize_cover(&png(1600, 400), &CoverOptions::default()).unwrap();
        assert_eq!(cover.mime_type, "image/jpeg");

        let decoded = image::load_from_memory(&cover.data).unwrap();
        assert_eq!(decoded.width(), 800);
        assert_eq!(decoded.height(), 200);
        assert_eq!(image::guess_format(&cover.data).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn small_image_is_not_upscaled() {
        let options = CoverOptions {
            max_dimension: 500,
            quality: 85,
        };
        let cover = normalize_cover(&png(120, 90), &options).unwrap();
        let decoded = image::load_from_memory(&cover.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 90));
    }

    #[test]
    fn garbage_is_rejected() {
        let err = normalize_cover(b"this is not an image", &CoverOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidImageFormat));
    }
}
