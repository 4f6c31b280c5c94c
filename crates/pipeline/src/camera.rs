//! Scoped camera acquisition.
//!
//! The stream is started when a [`CameraSession`] is opened and stopped when
//! it is dropped, on every exit path.

use foodlog_core::ErrorCode;
use foodlog_image::{ImageError, RawImage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("camera unavailable: {0}")]
    Unavailable(String),

    #[error("captured frame unusable: {0}")]
    Frame(#[from] ImageError),
}

impl CameraError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CameraError::PermissionDenied => ErrorCode::PermissionDenied,
            CameraError::Unavailable(_) => ErrorCode::IoError,
            CameraError::Frame(e) => e.code(),
        }
    }
}

/// A platform camera.
pub trait CameraDevice {
    /// Acquire the stream (permission prompt, device open).
    fn start(&mut self) -> Result<(), CameraError>;

    /// Release every track. Must be safe to call on a stopped device.
    fn stop(&mut self);

    /// Grab the current frame.
    fn capture_frame(&mut self) -> Result<RawImage, CameraError>;
}

/// An open camera stream, released on drop.
pub struct CameraSession<'a, D: CameraDevice + ?Sized> {
    device: &'a mut D,
}

impl<'a, D: CameraDevice + ?Sized> CameraSession<'a, D> {
    /// Start the stream. If starting fails nothing needs releasing.
    pub fn open(device: &'a mut D) -> Result<Self, CameraError> {
        device.start()?;
        tracing::debug!("Camera stream started");
        Ok(Self { device })
    }

    pub fn capture(&mut self) -> Result<RawImage, CameraError> {
        self.device.capture_frame()
    }
}

impl<D: CameraDevice + ?Sized> Drop for CameraSession<'_, D> {
    fn drop(&mut self) {
        self.device.stop();
        tracing::debug!("Camera stream released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    #[derive(Default)]
    struct FakeCamera {
        deny: bool,
        streaming: bool,
        starts: u32,
        stops: u32,
        broken_frames: bool,
    }

    impl CameraDevice for FakeCamera {
        fn start(&mut self) -> Result<(), CameraError> {
            if self.deny {
                return Err(CameraError::PermissionDenied);
            }
            self.starts += 1;
            self.streaming = true;
            Ok(())
        }

        fn stop(&mut self) {
            self.stops += 1;
            self.streaming = false;
        }

        fn capture_frame(&mut self) -> Result<RawImage, CameraError> {
            if self.broken_frames {
                return Err(CameraError::Unavailable("sensor error".into()));
            }
            let frame = DynamicImage::ImageRgb8(RgbImage::new(8, 6));
            Ok(RawImage::from_pixels(frame, foodlog_image::ImageFormat::Jpeg)?)
        }
    }

    #[test]
    fn test_stream_released_after_capture() {
        let mut camera = FakeCamera::default();
        {
            let mut session = CameraSession::open(&mut camera).unwrap();
            assert_eq!(session.capture().unwrap().dimensions(), (8, 6));
        }
        assert!(!camera.streaming);
        assert_eq!((camera.starts, camera.stops), (1, 1));
    }

    #[test]
    fn test_stream_released_on_error_path() {
        let mut camera = FakeCamera {
            broken_frames: true,
            ..FakeCamera::default()
        };
        let result = CameraSession::open(&mut camera).and_then(|mut s| s.capture());
        assert!(result.is_err());
        assert!(!camera.streaming);
        assert_eq!(camera.stops, 1);
    }

    #[test]
    fn test_denied_permission_starts_nothing() {
        let mut camera = FakeCamera {
            deny: true,
            ..FakeCamera::default()
        };
        let err = CameraSession::open(&mut camera).err().unwrap();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
        assert_eq!(camera.stops, 0);
    }
}
