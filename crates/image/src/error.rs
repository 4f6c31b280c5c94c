//! Error types for the image crate.

use crate::ImageFormat;
use foodlog_core::ErrorCode;
use thiserror::Error;

/// Result type alias for image operations.
pub type Result<T> = std::result::Result<T, ImageError>;

/// Errors that can occur while decoding or encoding photos.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Magic bytes match no known image format
    #[error("Unknown image format")]
    UnknownFormat,

    /// Format recognised but not decodable here
    #[error("Unsupported image format: {}", .0.mime_type())]
    UnsupportedFormat(ImageFormat),

    /// Invalid image data
    #[error("Invalid image data: {0}")]
    InvalidData(String),

    /// Encoding produced no usable output
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    /// Malformed `data:` URI
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    /// Error from the underlying codec
    #[error("Image processing error: {0}")]
    Processing(#[from] image::ImageError),
}

impl ImageError {
    /// Map onto the shared error taxonomy.
    pub fn code(&self) -> ErrorCode {
        match self {
            ImageError::EncodingFailed(_) => ErrorCode::EncodingFailed,
            ImageError::Processing(image::ImageError::Encoding(_)) => ErrorCode::EncodingFailed,
            ImageError::UnknownFormat
            | ImageError::UnsupportedFormat(_)
            | ImageError::InvalidData(_)
            | ImageError::InvalidDataUri(_)
            | ImageError::Processing(_) => ErrorCode::DecodeFailed,
        }
    }
}
