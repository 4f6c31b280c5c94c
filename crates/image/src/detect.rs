//! Image format detection from magic bytes.

use crate::{ImageError, Result};

/// Containers a captured or uploaded photo may arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
    /// HEIF stills; recognized but never decoded
    Heic,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Heic => "image/heic",
        }
    }

    /// Parse a MIME type such as `image/jpeg`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/png" => Some(ImageFormat::Png),
            "image/gif" => Some(ImageFormat::Gif),
            "image/webp" => Some(ImageFormat::WebP),
            "image/bmp" => Some(ImageFormat::Bmp),
            "image/heic" | "image/heif" => Some(ImageFormat::Heic),
            _ => None,
        }
    }

    /// Codec used to decode this format, if one is compiled in.
    pub(crate) fn codec(&self) -> Option<image::ImageFormat> {
        match self {
            ImageFormat::Jpeg => Some(image::ImageFormat::Jpeg),
            ImageFormat::Png => Some(image::ImageFormat::Png),
            ImageFormat::Gif => Some(image::ImageFormat::Gif),
            ImageFormat::WebP => Some(image::ImageFormat::WebP),
            ImageFormat::Bmp | ImageFormat::Heic => None,
        }
    }
}

/// Leading bytes that identify a container, optionally at an offset.
struct Signature {
    offset: usize,
    magic: &'static [u8],
    format: ImageFormat,
}

const fn sig(offset: usize, magic: &'static [u8], format: ImageFormat) -> Signature {
    Signature { offset, magic, format }
}

const SIGNATURES: &[Signature] = &[
    sig(0, &[0xFF, 0xD8, 0xFF], ImageFormat::Jpeg),
    sig(0, b"\x89PNG\r\n\x1a\n", ImageFormat::Png),
    sig(0, b"GIF87a", ImageFormat::Gif),
    sig(0, b"GIF89a", ImageFormat::Gif),
    sig(0, b"BM", ImageFormat::Bmp),
];

/// ISO-BMFF brands written by phone cameras for HEIF stills.
const HEIF_BRANDS: [&[u8; 4]; 3] = [b"heic", b"heix", b"mif1"];

impl Signature {
    fn matches(&self, data: &[u8]) -> bool {
        data.get(self.offset..).is_some_and(|rest| rest.starts_with(self.magic))
    }
}

/// Identify a photo's container from its first bytes.
///
/// Only the header is inspected; the body may still fail to decode.
///
/// ```
/// use foodlog_image::{detect_format, ImageFormat};
///
/// let jpeg_data = [0xFF, 0xD8, 0xFF, 0xE0];
/// assert!(matches!(detect_format(&jpeg_data), Ok(ImageFormat::Jpeg)));
/// ```
pub fn detect_format(data: &[u8]) -> Result<ImageFormat> {
    if data.len() < 4 {
        return Err(ImageError::InvalidData(format!(
            "{} bytes is too short to identify an image",
            data.len()
        )));
    }

    if let Some(found) = SIGNATURES.iter().find(|s| s.matches(data)) {
        return Ok(found.format);
    }

    match (data.get(0..4), data.get(4..8), data.get(8..12)) {
        (Some(b"RIFF"), _, Some(b"WEBP")) => Ok(ImageFormat::WebP),
        (_, Some(b"ftyp"), Some(brand)) if HEIF_BRANDS.iter().any(|b| b.as_slice() == brand) => {
            Ok(ImageFormat::Heic)
        }
        _ => Err(ImageError::UnknownFormat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_common_headers() {
        let cases: [(&[u8], ImageFormat); 5] = [
            (&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F'], ImageFormat::Jpeg),
            (b"\x89PNG\r\n\x1a\n\x00\x00", ImageFormat::Png),
            (b"GIF87a\x01\x00", ImageFormat::Gif),
            (b"RIFF\x24\x00\x00\x00WEBPVP8 ", ImageFormat::WebP),
            (b"BM\x36\x00\x00\x00", ImageFormat::Bmp),
        ];
        for (header, expected) in cases {
            assert_eq!(detect_format(header).unwrap(), expected);
        }
    }

    #[test]
    fn test_riff_without_webp_is_unknown() {
        assert!(matches!(detect_format(b"RIFF\x00\x00\x00\x00WAVE"), Err(ImageError::UnknownFormat)));
    }

    #[test]
    fn test_detect_heic() {
        let data = b"\x00\x00\x00\x18ftypheic\x00\x00";
        assert_eq!(detect_format(data).unwrap(), ImageFormat::Heic);
        assert!(ImageFormat::Heic.codec().is_none());
    }

    #[test]
    fn test_unknown_and_short_input() {
        assert!(matches!(detect_format(&[0, 0, 0, 0]), Err(ImageError::UnknownFormat)));
        assert!(matches!(detect_format(&[0xFF]), Err(ImageError::InvalidData(_))));
    }

    #[test]
    fn test_mime_round_trip() {
        for format in [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP, ImageFormat::Heic] {
            assert_eq!(ImageFormat::from_mime(format.mime_type()), Some(format));
        }
        assert_eq!(ImageFormat::from_mime("image/jpg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_mime("text/plain"), None);
    }
}
