//! Storage medium abstraction.
//!
//! The store only needs string get/set/remove plus a usage figure, so a local
//! map, a directory of files or a synchronized remote service can all sit
//! behind the same contract.

use crate::error::BackendError;

/// Bytes in use and the configured ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StorageUsage {
    pub used_bytes: u64,
    /// `None` means unbounded
    pub quota_bytes: Option<u64>,
}

impl StorageUsage {
    /// Bytes still free, `u64::MAX` when unbounded.
    pub fn available(&self) -> u64 {
        self.quota_bytes
            .map_or(u64::MAX, |quota| quota.saturating_sub(self.used_bytes))
    }
}

/// A string-keyed persistent medium.
///
/// `set_raw` must be all-or-nothing: on error the previous value stays
/// readable.
pub trait StorageBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Raw stored text for `key`, if any.
    fn get_raw(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Replace the value under `key`.
    fn set_raw(&self, key: &str, value: &str) -> Result<(), BackendError>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), BackendError>;

    /// Current usage across all keys.
    fn usage(&self) -> Result<StorageUsage, BackendError>;
}

/// Reject a write that would push usage past the quota.
///
/// `current_len` is the size of the value being replaced (0 if new).
pub(crate) fn check_quota(
    usage: StorageUsage,
    current_len: u64,
    new_len: u64,
) -> Result<(), BackendError> {
    let Some(quota) = usage.quota_bytes else {
        return Ok(());
    };
    let others = usage.used_bytes.saturating_sub(current_len);
    if others.saturating_add(new_len) > quota {
        return Err(BackendError::QuotaExceeded {
            requested: new_len,
            available: quota.saturating_sub(others),
        });
    }
    Ok(())
}

pub(crate) fn validate_key(key: &str) -> Result<(), BackendError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(BackendError::InvalidKey(key.to_string()))
    }
}
