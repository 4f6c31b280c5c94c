//! Encoded photos and `data:` URIs.

use crate::{detect_format, ImageError, ImageFormat, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::io::Cursor;

/// A compressed photo ready for storage or transmission.
///
/// Never empty: construction fails rather than producing a zero-length payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    bytes: Vec<u8>,
    format: ImageFormat,
    width: u32,
    height: u32,
    quality: Option<u8>,
}

impl EncodedImage {
    /// Wrap encoder output, rejecting empty payloads.
    pub fn new(bytes: Vec<u8>, format: ImageFormat, width: u32, height: u32, quality: Option<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(ImageError::EncodingFailed("encoder produced no data".into()));
        }
        Ok(Self {
            bytes,
            format,
            width,
            height,
            quality,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Byte length of the payload.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Output `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Encoder quality, when known.
    pub fn quality(&self) -> Option<u8> {
        self.quality
    }

    /// Render as `data:<mime>;base64,<payload>`.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), BASE64.encode(&self.bytes))
    }

    /// Parse a `data:` URI produced by [`EncodedImage::to_data_uri`] or a browser.
    ///
    /// The declared MIME type must match the payload's magic bytes.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| ImageError::InvalidDataUri("missing `data:` scheme".into()))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| ImageError::InvalidDataUri("missing `,` separator".into()))?;
        let mime = meta
            .strip_suffix(";base64")
            .ok_or_else(|| ImageError::InvalidDataUri("only base64 payloads are supported".into()))?;
        let declared = ImageFormat::from_mime(mime)
            .ok_or_else(|| ImageError::InvalidDataUri(format!("unsupported MIME type `{mime}`")))?;

        let bytes = BASE64
            .decode(payload.trim())
            .map_err(|e| ImageError::InvalidDataUri(format!("bad base64 payload: {e}")))?;
        if bytes.is_empty() {
            return Err(ImageError::InvalidDataUri("empty payload".into()));
        }

        let detected = detect_format(&bytes)?;
        if detected != declared {
            return Err(ImageError::InvalidDataUri(format!(
                "declared {} but payload is {}",
                declared.mime_type(),
                detected.mime_type()
            )));
        }

        let (width, height) = image::io::Reader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .map_err(|e| ImageError::InvalidData(e.to_string()))?
            .into_dimensions()?;

        Self::new(bytes, declared, width, height, None)
    }
}
