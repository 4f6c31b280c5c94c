//! Error types for the store.

use foodlog_core::ErrorCode;
use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Failure reported by a [`StorageBackend`](crate::StorageBackend).
#[derive(Debug, Error)]
pub enum BackendError {
    /// The medium has no room for the value
    #[error("quota exceeded: {requested} bytes requested, {available} available")]
    QuotaExceeded { requested: u64, available: u64 },

    /// Key contains characters the medium cannot store
    #[error("invalid key `{0}`")]
    InvalidKey(String),

    /// I/O failure on the underlying medium
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored bytes cannot be a record at all (e.g. not UTF-8)
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Medium unusable (poisoned lock, detached device)
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Typed failure of a store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write was rejected for lack of space; nothing was changed
    #[error("storage quota exceeded writing `{namespace}` ({requested} bytes requested, {available} available)")]
    QuotaExceeded {
        namespace: &'static str,
        requested: u64,
        available: u64,
    },

    /// The value could not be serialized
    #[error("failed to serialize `{namespace}`: {source}")]
    Serialization {
        namespace: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Any other backend failure, on read or write
    #[error("storage failed for `{namespace}`: {source}")]
    Unknown {
        namespace: &'static str,
        #[source]
        source: BackendError,
    },
}

impl StoreError {
    pub(crate) fn from_backend(namespace: &'static str, error: BackendError) -> Self {
        match error {
            BackendError::QuotaExceeded { requested, available } => StoreError::QuotaExceeded {
                namespace,
                requested,
                available,
            },
            other => StoreError::Unknown {
                namespace,
                source: other,
            },
        }
    }

    /// Map onto the shared error taxonomy.
    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::QuotaExceeded { .. } => ErrorCode::QuotaExceeded,
            StoreError::Serialization { .. } | StoreError::Unknown { .. } => ErrorCode::StorageFailed,
        }
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded { .. })
    }

    /// Namespace the failed operation targeted.
    pub fn namespace(&self) -> &'static str {
        match self {
            StoreError::QuotaExceeded { namespace, .. }
            | StoreError::Serialization { namespace, .. }
            | StoreError::Unknown { namespace, .. } => namespace,
        }
    }
}
