//! Rendering photos to size-bounded JPEG.
//!
//! Two modes share one failure contract:
//! - **cropped**: the crop region defines the output size (times the device
//!   pixel ratio), encoded at an aggressive quality so entries stay small in
//!   the quota-limited store;
//! - **bounded**: the whole photo is scaled so its longest edge fits
//!   `max_edge`, encoded at a higher quality for network transmission.
//!
//! Either an [`EncodedImage`] with bytes comes back or an
//! [`ImageError::EncodingFailed`]; never an empty payload.

use crate::alpha::{flatten_alpha, DEFAULT_BACKGROUND};
use crate::dimensions::{fit_within, scale_by};
use crate::{CropRegion, EncodedImage, ImageError, ImageFormat, RawImage, Result};
use foodlog_core::config::ImageConfig;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use std::io::Cursor;
use std::sync::Arc;

/// Lowest quality the soft size ceiling will step down to.
pub const QUALITY_FLOOR: u8 = 10;

/// Quality decrement per re-encode when over the soft ceiling.
pub const QUALITY_STEP: u8 = 10;

/// Rasterizer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterOptions {
    /// JPEG quality for cropped output (1-100)
    pub crop_quality: u8,
    /// JPEG quality for bounded output (1-100)
    pub full_quality: u8,
    /// Longest edge for bounded output
    pub max_edge: u32,
    /// Device pixel density for cropped output
    pub pixel_ratio: f32,
    /// Soft ceiling on encoded bytes (`None` disables it)
    pub soft_max_bytes: Option<usize>,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self::from(&ImageConfig::default())
    }
}

impl From<&ImageConfig> for RasterOptions {
    fn from(config: &ImageConfig) -> Self {
        Self {
            crop_quality: config.crop_quality,
            full_quality: config.full_quality,
            max_edge: config.max_edge,
            pixel_ratio: config.pixel_ratio,
            soft_max_bytes: (config.soft_max_bytes > 0).then_some(config.soft_max_bytes),
        }
    }
}

/// What to render, for [`Rasterizer::render_async`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderJob {
    /// Crop to a region at the configured crop quality
    Crop(CropRegion),
    /// Crop to a region at an explicit quality
    CropWithQuality(CropRegion, u8),
    /// Whole photo, longest edge bounded
    Bounded,
}

/// Renders [`RawImage`]s to [`EncodedImage`]s.
#[derive(Debug, Clone, Default)]
pub struct Rasterizer {
    options: RasterOptions,
}

impl Rasterizer {
    pub fn new(options: RasterOptions) -> Self {
        Self { options }
    }

    pub fn from_config(config: &ImageConfig) -> Self {
        Self::new(RasterOptions::from(config))
    }

    pub fn options(&self) -> &RasterOptions {
        &self.options
    }

    /// Crop at the configured crop quality.
    pub fn render_cropped(&self, image: &RawImage, region: CropRegion) -> Result<EncodedImage> {
        self.render(image, region, self.options.crop_quality)
    }

    /// Crop `image` to `region` and encode at `quality`.
    pub fn render(&self, image: &RawImage, region: CropRegion, quality: u8) -> Result<EncodedImage> {
        let (sx, sy, sw, sh) = source_rect(region, image.width(), image.height());
        let surface = flatten_alpha(image.pixels(), DEFAULT_BACKGROUND);
        let cropped = imageops::crop_imm(&surface, sx, sy, sw, sh).to_image();

        let (ow, oh) = scale_by(sw, sh, self.options.pixel_ratio);
        let output = if (ow, oh) == (sw, sh) {
            cropped
        } else {
            imageops::resize(&cropped, ow, oh, FilterType::Triangle)
        };

        tracing::debug!(
            source = ?(sx, sy, sw, sh),
            output = ?(ow, oh),
            quality,
            "Rendering cropped photo"
        );
        self.encode(output, quality)
    }

    /// Scale the whole photo to fit `max_edge` and encode at the full quality.
    pub fn render_bounded(&self, image: &RawImage) -> Result<EncodedImage> {
        let (w, h) = image.dimensions();
        let (nw, nh) = fit_within(w, h, self.options.max_edge);
        let surface = flatten_alpha(image.pixels(), DEFAULT_BACKGROUND);
        let output = if (nw, nh) == (w, h) {
            surface
        } else {
            imageops::resize(&surface, nw, nh, FilterType::Lanczos3)
        };

        tracing::debug!(from = ?(w, h), to = ?(nw, nh), "Rendering bounded photo");
        self.encode(output, self.options.full_quality)
    }

    /// Run a render job on the blocking pool.
    ///
    /// Dropping the returned future abandons the result; nothing is persisted.
    pub async fn render_async(&self, image: Arc<RawImage>, job: RenderJob) -> Result<EncodedImage> {
        let rasterizer = self.clone();
        tokio::task::spawn_blocking(move || match job {
            RenderJob::Crop(region) => rasterizer.render_cropped(&image, region),
            RenderJob::CropWithQuality(region, quality) => rasterizer.render(&image, region, quality),
            RenderJob::Bounded => rasterizer.render_bounded(&image),
        })
        .await
        .map_err(|e| ImageError::EncodingFailed(format!("raster task did not complete: {e}")))?
    }

    /// JPEG-encode, stepping quality down while over the soft ceiling.
    fn encode(&self, surface: RgbImage, quality: u8) -> Result<EncodedImage> {
        let (width, height) = surface.dimensions();
        if width == 0 || height == 0 {
            return Err(ImageError::EncodingFailed(format!("empty surface {width}x{height}")));
        }

        let surface = DynamicImage::ImageRgb8(surface);
        let mut quality = quality.clamp(1, 100);
        let mut best = (encode_jpeg(&surface, quality)?, quality);

        if let Some(ceiling) = self.options.soft_max_bytes {
            while best.0.len() > ceiling && quality > QUALITY_FLOOR {
                quality = quality.saturating_sub(QUALITY_STEP).max(QUALITY_FLOOR);
                let candidate = encode_jpeg(&surface, quality)?;
                if candidate.len() < best.0.len() {
                    best = (candidate, quality);
                }
            }
            if best.0.len() > ceiling {
                tracing::warn!(
                    bytes = best.0.len(),
                    ceiling,
                    quality = best.1,
                    "Encoded photo still above soft size ceiling"
                );
            }
        }

        let (bytes, quality) = best;
        EncodedImage::new(bytes, ImageFormat::Jpeg, width, height, Some(quality))
    }
}

fn encode_jpeg(surface: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    surface
        .write_to(&mut buffer, ImageOutputFormat::Jpeg(quality))
        .map_err(|e| ImageError::EncodingFailed(e.to_string()))?;
    let bytes = buffer.into_inner();
    if bytes.is_empty() {
        return Err(ImageError::EncodingFailed("encoder produced no data".into()));
    }
    Ok(bytes)
}

/// Map a percent region onto a natural-pixel rectangle `(x, y, w, h)`.
///
/// The rectangle is at least one pixel and always inside the image.
pub fn source_rect(region: CropRegion, width: u32, height: u32) -> (u32, u32, u32, u32) {
    let region = region.clamped();
    let axis = |origin: f64, size: f64, natural: u32| {
        let natural_f = f64::from(natural);
        let start = ((origin / 100.0 * natural_f).round() as u32).min(natural.saturating_sub(1));
        let len = ((size / 100.0 * natural_f).round() as u32).max(1).min(natural - start);
        (start, len)
    };
    let (x, w) = axis(region.x, region.width, width.max(1));
    let (y, h) = axis(region.y, region.height, height.max(1));
    (x, y, w, h)
}
