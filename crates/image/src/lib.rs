//! Photo processing for meal logging.
//!
//! This crate provides:
//! - Format detection from magic bytes
//! - Percent-based crop selection with clamping
//! - Cropped and bounded JPEG rendering with a soft size ceiling
//! - Alpha flattening before JPEG encoding
//! - `data:` URI encoding and parsing

mod alpha;
mod crop;
mod detect;
pub mod dimensions;
mod encoded;
mod error;
mod raster;
mod raw;

pub use alpha::{flatten_alpha, has_alpha_channel, DEFAULT_BACKGROUND};
pub use crop::{CropRegion, CropTransformer, MIN_CROP_PERCENT};
pub use detect::{detect_format, ImageFormat};
pub use encoded::EncodedImage;
pub use error::{ImageError, Result};
pub use raster::{source_rect, RasterOptions, Rasterizer, RenderJob, QUALITY_FLOOR, QUALITY_STEP};
pub use raw::RawImage;
