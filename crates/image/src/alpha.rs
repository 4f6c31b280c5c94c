//! Alpha flattening before JPEG encoding.
//!
//! JPEG has no alpha channel, so transparent pixels from PNG/WebP uploads are
//! composited over a solid background instead of being dropped to black.

use image::{DynamicImage, Rgb, RgbImage};

/// Background used for transparent pixels (white, like a blank canvas).
pub const DEFAULT_BACKGROUND: [u8; 3] = [255, 255, 255];

/// Composite `img` over `background` and return an opaque RGB surface.
pub fn flatten_alpha(img: &DynamicImage, background: [u8; 3]) -> RgbImage {
    if !has_alpha_channel(img) {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    let mut output = RgbImage::new(rgba.width(), rgba.height());

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = f32::from(a) / 255.0;
        let blend = |c: u8, bg: u8| (f32::from(c) * alpha + f32::from(bg) * (1.0 - alpha)).round() as u8;
        output.put_pixel(
            x,
            y,
            Rgb([blend(r, background[0]), blend(g, background[1]), blend(b, background[2])]),
        );
    }

    output
}

/// Check if an image has an alpha channel
pub fn has_alpha_channel(img: &DynamicImage) -> bool {
    img.color().has_alpha()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_flatten_over_white() {
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(0, 1, Rgba([0, 255, 0, 128]));
        img.put_pixel(1, 0, Rgba([0, 0, 255, 0]));
        img.put_pixel(1, 1, Rgba([255, 255, 0, 255]));

        let flat = flatten_alpha(&DynamicImage::ImageRgba8(img), DEFAULT_BACKGROUND);

        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 1), &Rgb([255, 255, 0]));
        let half = flat.get_pixel(0, 1);
        assert_eq!(half[1], 255);
        assert!(half[0] > 100 && half[0] < 155);
    }

    #[test]
    fn test_opaque_image_passes_through() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 2, Rgb([10, 20, 30])));
        assert!(!has_alpha_channel(&rgb));
        assert_eq!(flatten_alpha(&rgb, DEFAULT_BACKGROUND).get_pixel(2, 1), &Rgb([10, 20, 30]));
    }
}
