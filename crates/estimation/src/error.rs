//! Estimation gateway errors

use foodlog_core::ErrorCode;
use std::time::Duration;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Why a nutrition estimate could not be obtained.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("estimation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("estimation response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("estimation gateway misconfigured: {0}")]
    Config(String),

    /// Non-2xx status; `message` is the response body or its `error` field
    #[error("estimation service answered {status}: {message}")]
    ApiResponse { status: u16, message: String },

    /// Parsed, but a field is outside its allowed range
    #[error("estimate rejected: {0}")]
    InvalidEstimate(String),

    #[error("estimation paused after repeated failures")]
    CircuitOpen,

    #[error("no estimate within {0:?}")]
    Timeout(Duration),

    #[error("gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl ApiError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn api_response(status: u16, message: impl Into<String>) -> Self {
        Self::ApiResponse {
            status,
            message: message.into(),
        }
    }

    /// Shared taxonomy code. Everything but misconfiguration is an estimation failure.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        if matches!(self, Self::Config(_)) {
            ErrorCode::ConfigError
        } else {
            ErrorCode::EstimationFailed
        }
    }

    /// Transport hiccups, timeouts, throttling and 5xx answers.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(e) => e.is_connect() || e.is_timeout(),
            Self::ApiResponse { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Timeout(_) => true,
            _ => false,
        }
    }
}
