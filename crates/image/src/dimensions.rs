//! Output size calculation for the rasterizer.

/// Scale `(width, height)` so the longest edge is at most `max_edge`.
///
/// Aspect ratio is preserved, images are never upscaled, and neither edge
/// drops below one pixel.
///
/// # Example
/// ```
/// use foodlog_image::dimensions::fit_within;
///
/// assert_eq!(fit_within(4000, 3000, 1024), (1024, 768));
/// assert_eq!(fit_within(800, 600, 1024), (800, 600));
/// ```
pub fn fit_within(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let longest = width.max(height);
    if max_edge == 0 || longest <= max_edge {
        return (width, height);
    }

    let ratio = f64::from(max_edge) / f64::from(longest);
    let scale = |edge: u32| ((f64::from(edge) * ratio).round() as u32).clamp(1, max_edge);
    (scale(width), scale(height))
}

/// Multiply `(width, height)` by a device pixel ratio.
pub fn scale_by(width: u32, height: u32, ratio: f32) -> (u32, u32) {
    if !ratio.is_finite() || ratio <= 0.0 || (ratio - 1.0).abs() < f32::EPSILON {
        return (width, height);
    }
    let scale = |edge: u32| ((f64::from(edge) * f64::from(ratio)).round() as u32).max(1);
    (scale(width), scale(height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landscape_fit() {
        assert_eq!(fit_within(4000, 3000, 1024), (1024, 768));
    }

    #[test]
    fn test_portrait_fit() {
        assert_eq!(fit_within(3000, 4000, 1024), (768, 1024));
    }

    #[test]
    fn test_no_upscale() {
        assert_eq!(fit_within(500, 400, 1024), (500, 400));
    }

    #[test]
    fn test_extreme_aspect_keeps_one_pixel() {
        assert_eq!(fit_within(10_000, 2, 1000), (1000, 1));
    }

    #[test]
    fn test_pixel_ratio() {
        assert_eq!(scale_by(100, 50, 2.0), (200, 100));
        assert_eq!(scale_by(100, 50, 1.0), (100, 50));
        assert_eq!(scale_by(1, 1, 0.25), (1, 1));
        assert_eq!(scale_by(100, 50, f32::NAN), (100, 50));
    }
}
