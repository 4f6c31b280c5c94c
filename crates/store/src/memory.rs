//! In-memory backend with a byte budget.

use crate::backend::{check_quota, validate_key, StorageBackend, StorageUsage};
use crate::error::BackendError;
use std::collections::HashMap;
use std::sync::RwLock;

/// Map-backed medium, counted in UTF-8 bytes of keys plus values.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
    quota_bytes: Option<u64>,
}

impl MemoryBackend {
    /// Unbounded backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that rejects writes beyond `quota_bytes`.
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn poisoned() -> BackendError {
        BackendError::Unavailable("memory backend lock poisoned".into())
    }
}

fn entry_len(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}

impl StorageBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get_raw(&self, key: &str) -> Result<Option<String>, BackendError> {
        let guard = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(guard.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<(), BackendError> {
        validate_key(key)?;
        let mut guard = self.entries.write().map_err(|_| Self::poisoned())?;

        let usage = StorageUsage {
            used_bytes: guard.iter().map(|(k, v)| entry_len(k, v)).sum(),
            quota_bytes: self.quota_bytes,
        };
        let current = guard.get(key).map_or(0, |v| entry_len(key, v));
        check_quota(usage, current, entry_len(key, value))?;

        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        let mut guard = self.entries.write().map_err(|_| Self::poisoned())?;
        guard.remove(key);
        Ok(())
    }

    fn usage(&self) -> Result<StorageUsage, BackendError> {
        let guard = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(StorageUsage {
            used_bytes: guard.iter().map(|(k, v)| entry_len(k, v)).sum(),
            quota_bytes: self.quota_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get_raw("profile").unwrap(), None);

        backend.set_raw("profile", "{}").unwrap();
        assert_eq!(backend.get_raw("profile").unwrap().as_deref(), Some("{}"));

        backend.remove("profile").unwrap();
        backend.remove("profile").unwrap();
        assert_eq!(backend.get_raw("profile").unwrap(), None);
    }

    #[test]
    fn test_quota_rejects_and_keeps_previous_value() {
        let backend = MemoryBackend::with_quota(20);
        backend.set_raw("a", "0123456789").unwrap();

        let err = backend.set_raw("a", &"x".repeat(40)).unwrap_err();
        assert!(matches!(err, BackendError::QuotaExceeded { .. }));
        assert_eq!(backend.get_raw("a").unwrap().as_deref(), Some("0123456789"));
    }

    #[test]
    fn test_usage_counts_keys_and_values() {
        let backend = MemoryBackend::with_quota(100);
        backend.set_raw("ab", "cde").unwrap();
        let usage = backend.usage().unwrap();
        assert_eq!(usage.used_bytes, 5);
        assert_eq!(usage.available(), 95);
    }
}
