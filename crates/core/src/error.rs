//! Error taxonomy shared by every foodlog crate
//!
//! Each crate keeps its own `thiserror` enum, but all of them map onto the
//! [`ErrorCode`] defined here. The presentation layer reacts to the code's
//! [`Recovery`] (retry, prompt the user, evict old data) without matching on
//! crate-specific variants.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// What went wrong, independent of which crate noticed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // photo pipeline
    CropInvalid,
    EncodingFailed,
    DecodeFailed,
    PermissionDenied,

    EstimationFailed,

    // durable store
    QuotaExceeded,
    CorruptRecord,
    StorageFailed,

    // user input
    ValidationError,
    InvalidInput,

    // configuration
    ConfigError,
    ConfigParseError,
    ConfigValidationError,

    IoError,
    FileNotFound,
    Internal,
}

/// How a caller is expected to respond to an [`ErrorCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    /// Handled where it happened; only logged
    Recovered,
    /// Same input may succeed later
    Retry,
    /// Free space, then retry
    FreeSpace,
    /// The user has to change what they entered
    FixInput,
    /// The configuration file has to change
    FixConfig,
    /// Nothing the user can do
    Report,
}

impl ErrorCode {
    /// Stable identifier, also used in serialized reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CropInvalid => "crop_invalid",
            ErrorCode::EncodingFailed => "encoding_failed",
            ErrorCode::DecodeFailed => "decode_failed",
            ErrorCode::PermissionDenied => "permission_denied",
            ErrorCode::EstimationFailed => "estimation_failed",
            ErrorCode::QuotaExceeded => "quota_exceeded",
            ErrorCode::CorruptRecord => "corrupt_record",
            ErrorCode::StorageFailed => "storage_failed",
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::InvalidInput => "invalid_input",
            ErrorCode::ConfigError => "config_error",
            ErrorCode::ConfigParseError => "config_parse_error",
            ErrorCode::ConfigValidationError => "config_validation_error",
            ErrorCode::IoError => "io_error",
            ErrorCode::FileNotFound => "file_not_found",
            ErrorCode::Internal => "internal",
        }
    }

    pub fn recovery(&self) -> Recovery {
        match self {
            ErrorCode::CropInvalid | ErrorCode::CorruptRecord => Recovery::Recovered,
            ErrorCode::EncodingFailed | ErrorCode::EstimationFailed | ErrorCode::IoError => Recovery::Retry,
            ErrorCode::QuotaExceeded => Recovery::FreeSpace,
            ErrorCode::DecodeFailed
            | ErrorCode::PermissionDenied
            | ErrorCode::ValidationError
            | ErrorCode::InvalidInput => Recovery::FixInput,
            ErrorCode::ConfigError
            | ErrorCode::ConfigParseError
            | ErrorCode::ConfigValidationError
            | ErrorCode::FileNotFound => Recovery::FixConfig,
            ErrorCode::StorageFailed | ErrorCode::Internal => Recovery::Report,
        }
    }

    /// Whether the error must reach the caller at all.
    pub fn is_surfaced(&self) -> bool {
        self.recovery() != Recovery::Recovered
    }

    pub fn is_retryable(&self) -> bool {
        self.recovery() == Recovery::Retry
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error: a code, what happened, where, and what to do about it.
#[derive(Error, Debug)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    /// Field or operation the error refers to
    pub context: Option<String>,
    /// Hint shown to the user
    pub suggestion: Option<String>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(context) => write!(f, "{}: {} ({})", context, self.message, self.code)?,
            None => write!(f, "{} ({})", self.message, self.code)?,
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, ". {suggestion}")?;
        }
        Ok(())
    }
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            suggestion: None,
            source: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Configuration could not be read or parsed.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// A configuration value is out of range. `field` is the dotted TOML key.
    pub fn config_invalid(field: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigValidationError, message).with_context(field)
    }

    /// A user-supplied value failed validation. `field` is the camelCase record field.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message).with_context(field)
    }

    /// Snapshot for logs and the presentation layer.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code,
            recovery: self.code.recovery(),
            message: self.message.clone(),
            context: self.context.clone(),
            suggestion: self.suggestion.clone(),
            cause: self.source.as_ref().map(ToString::to_string),
        }
    }
}

/// Serializable view of an [`Error`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub recovery: Recovery,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            _ => ErrorCode::IoError,
        };
        Error::new(code, err.to_string()).with_source(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::new(ErrorCode::ConfigParseError, err.message().to_string()).with_source(err)
    }
}

/// Attach context to any result whose error converts into [`Error`].
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_suggestion(suggestion))
    }
}
