//! Decoded source photos.

use crate::{detect_format, ImageError, ImageFormat, Result};
use image::{DynamicImage, GenericImageView};

/// A decoded photo with its natural pixel dimensions.
///
/// Owned by the capture/upload step and dropped once encoded.
#[derive(Debug, Clone)]
pub struct RawImage {
    pixels: DynamicImage,
    source_format: ImageFormat,
}

impl RawImage {
    /// Decode captured or uploaded bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let source_format = detect_format(data)?;
        let codec = source_format
            .codec()
            .ok_or(ImageError::UnsupportedFormat(source_format))?;
        let pixels = image::load_from_memory_with_format(data, codec)?;
        Self::from_pixels(pixels, source_format)
    }

    /// Wrap an already decoded bitmap (e.g. a camera frame).
    pub fn from_pixels(pixels: DynamicImage, source_format: ImageFormat) -> Result<Self> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidData(format!("degenerate image {width}x{height}")));
        }
        Ok(Self { pixels, source_format })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Natural `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn source_format(&self) -> ImageFormat {
        self.source_format
    }

    pub(crate) fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }
}
