//! Pipeline errors.

use crate::camera::CameraError;
use foodlog_core::models::EntryId;
use foodlog_core::ErrorCode;
use foodlog_image::ImageError;
use foodlog_store::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failures the caller must act on.
///
/// Estimation failures are not here: they degrade to
/// [`EstimateOutcome::Failed`](crate::EstimateOutcome::Failed).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Invalid(#[from] foodlog_core::Error),

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error("no entry with id `{0}`")]
    NotFound(EntryId),

    #[error("background task failed: {0}")]
    Task(String),
}

impl PipelineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PipelineError::Image(e) => e.code(),
            PipelineError::Store(e) => e.code(),
            PipelineError::Invalid(e) => e.code,
            PipelineError::Camera(e) => e.code(),
            PipelineError::NotFound(_) => ErrorCode::InvalidInput,
            PipelineError::Task(_) => ErrorCode::Internal,
        }
    }

    /// True for a rejected store write the caller may retry with eviction.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, PipelineError::Store(e) if e.is_quota_exceeded())
    }
}
