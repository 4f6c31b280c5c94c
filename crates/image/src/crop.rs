//! Interactive crop selection.
//!
//! Regions are percentages of the displayed photo, so they stay valid when
//! the preview is resized and map onto natural pixels at commit time.

use crate::{EncodedImage, RawImage, Rasterizer, Result};
use serde::{Deserialize, Serialize};

/// Smallest width or height a region may have, in percent.
pub const MIN_CROP_PERCENT: f64 = 1.0;

const FULL_PERCENT: f64 = 100.0;

/// Tolerance for float rounding when checking region bounds.
const BOUNDS_EPSILON: f64 = 1e-9;

/// Rectangle in percent of the displayed image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRegion {
    /// The whole image.
    pub const FULL: CropRegion = CropRegion {
        x: 0.0,
        y: 0.0,
        width: FULL_PERCENT,
        height: FULL_PERCENT,
    };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Whether the region already satisfies every bound.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height].iter().all(|v| v.is_finite())
            && self.x >= 0.0
            && self.y >= 0.0
            && self.width >= MIN_CROP_PERCENT
            && self.height >= MIN_CROP_PERCENT
            && self.x + self.width <= FULL_PERCENT + BOUNDS_EPSILON
            && self.y + self.height <= FULL_PERCENT + BOUNDS_EPSILON
    }

    /// Nearest valid region.
    ///
    /// Size is clamped to `[MIN_CROP_PERCENT, 100]` first, then the origin is
    /// shifted back inside the image so the selection keeps its size.
    /// Non-finite values count as zero.
    #[must_use]
    pub fn clamped(self) -> Self {
        let (x, width) = clamp_axis(self.x, self.width);
        let (y, height) = clamp_axis(self.y, self.height);
        Self { x, y, width, height }
    }
}

impl Default for CropRegion {
    fn default() -> Self {
        Self::FULL
    }
}

fn clamp_axis(origin: f64, size: f64) -> (f64, f64) {
    let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
    let size = finite(size).clamp(MIN_CROP_PERCENT, FULL_PERCENT);
    let origin = finite(origin).clamp(0.0, FULL_PERCENT - size);
    (origin, size)
}

/// Holds the crop selection for one loaded photo.
#[derive(Debug, Clone, PartialEq)]
pub struct CropTransformer {
    display_width: u32,
    display_height: u32,
    region: CropRegion,
}

impl Default for CropTransformer {
    fn default() -> Self {
        Self {
            display_width: 0,
            display_height: 0,
            region: CropRegion::FULL,
        }
    }
}

impl CropTransformer {
    /// Transformer for a photo shown at `display_width x display_height`.
    pub fn for_display(display_width: u32, display_height: u32) -> Self {
        let mut transformer = Self::default();
        transformer.initialize(display_width, display_height);
        transformer
    }

    /// Reset to the whole photo. Always returns [`CropRegion::FULL`].
    pub fn initialize(&mut self, display_width: u32, display_height: u32) -> CropRegion {
        self.display_width = display_width;
        self.display_height = display_height;
        self.region = CropRegion::FULL;
        self.region
    }

    /// Current selection.
    pub fn region(&self) -> CropRegion {
        self.region
    }

    /// Apply a dragged selection, clamping it into bounds. Never fails.
    pub fn update(&mut self, region: CropRegion) -> CropRegion {
        let clamped = region.clamped();
        if clamped != region {
            tracing::debug!(requested = ?region, applied = ?clamped, "Crop region clamped");
        }
        self.region = clamped;
        clamped
    }

    /// Apply a selection measured in displayed pixels.
    ///
    /// Without known display dimensions the current region is kept.
    pub fn update_from_display_pixels(&mut self, x: f64, y: f64, width: f64, height: f64) -> CropRegion {
        if self.display_width == 0 || self.display_height == 0 {
            return self.region;
        }
        let dw = f64::from(self.display_width);
        let dh = f64::from(self.display_height);
        self.update(CropRegion::new(
            x / dw * FULL_PERCENT,
            y / dh * FULL_PERCENT,
            width / dw * FULL_PERCENT,
            height / dh * FULL_PERCENT,
        ))
    }

    /// Encode the current selection. Works without any prior `update`.
    pub fn commit(&self, image: &RawImage, rasterizer: &Rasterizer) -> Result<EncodedImage> {
        rasterizer.render_cropped(image, self.region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn within_bounds(r: &CropRegion) -> bool {
        r.x >= 0.0
            && r.y >= 0.0
            && r.width >= MIN_CROP_PERCENT
            && r.height >= MIN_CROP_PERCENT
            && r.x + r.width <= 100.0 + 1e-9
            && r.y + r.height <= 100.0 + 1e-9
    }

    #[test]
    fn test_initialize_is_full_image() {
        let mut crop = CropTransformer::default();
        assert_eq!(crop.initialize(640, 480), CropRegion::FULL);
        assert_eq!(crop.initialize(1, 10_000), CropRegion::FULL);
    }

    #[test]
    fn test_negative_origin_shifted_in() {
        let mut crop = CropTransformer::for_display(100, 100);
        let r = crop.update(CropRegion::new(-10.0, -5.0, 50.0, 40.0));
        assert_eq!(r, CropRegion::new(0.0, 0.0, 50.0, 40.0));
    }

    #[test]
    fn test_overflow_shifted_back() {
        let mut crop = CropTransformer::for_display(100, 100);
        let r = crop.update(CropRegion::new(80.0, 90.0, 50.0, 30.0));
        assert_eq!(r, CropRegion::new(50.0, 70.0, 50.0, 30.0));
    }

    #[test]
    fn test_degenerate_size_gets_minimum() {
        let mut crop = CropTransformer::for_display(100, 100);
        let r = crop.update(CropRegion::new(99.5, 10.0, 0.0, -3.0));
        assert_eq!(r.width, MIN_CROP_PERCENT);
        assert_eq!(r.height, MIN_CROP_PERCENT);
        assert_eq!(r.x, 99.0);
        assert!(within_bounds(&r));
    }

    #[test]
    fn test_nan_treated_as_zero() {
        let r = CropRegion::new(f64::NAN, 5.0, f64::INFINITY, 20.0).clamped();
        assert_eq!(r.x, 0.0);
        assert_eq!(r.width, MIN_CROP_PERCENT);
        assert!(r.is_valid());
    }

    #[test]
    fn test_valid_region_untouched() {
        let region = CropRegion::new(10.0, 20.0, 30.0, 40.0);
        assert!(region.is_valid());
        assert_eq!(region.clamped(), region);
    }

    #[test]
    fn test_display_pixels_conversion() {
        let mut crop = CropTransformer::for_display(400, 200);
        let r = crop.update_from_display_pixels(100.0, 50.0, 200.0, 100.0);
        assert_eq!(r, CropRegion::new(25.0, 25.0, 50.0, 50.0));
    }

    #[test]
    fn test_display_pixels_without_dimensions() {
        let mut crop = CropTransformer::default();
        assert_eq!(crop.update_from_display_pixels(1.0, 1.0, 5.0, 5.0), CropRegion::FULL);
    }

    proptest! {
        #[test]
        fn prop_update_always_in_bounds(
            x in -500.0f64..500.0,
            y in -500.0f64..500.0,
            w in -500.0f64..500.0,
            h in -500.0f64..500.0,
        ) {
            let mut crop = CropTransformer::for_display(640, 480);
            let r = crop.update(CropRegion::new(x, y, w, h));
            prop_assert!(within_bounds(&r), "out of bounds: {:?}", r);
            prop_assert_eq!(crop.region(), r);
        }

        #[test]
        fn prop_initialize_ignores_dimensions(w in 1u32..10_000, h in 1u32..10_000) {
            prop_assert_eq!(CropTransformer::for_display(w, h).region(), CropRegion::FULL);
        }
    }
}
