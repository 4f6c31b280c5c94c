//! Quota-aware durable store for meal and water logs.
//!
//! Four independent namespaces (`foodLog`, `waterLog`, `profile`,
//! `notificationSettings`) are stored as JSON text behind a pluggable
//! [`StorageBackend`]. Absent or corrupt records read as the namespace
//! default; a medium that cannot be read is a [`StoreError`] from
//! [`DurableStore::try_read`] and from every read-modify-write, so an
//! unreadable collection is never replaced by a shorter one. Quota recovery
//! is left to the caller ([`DurableStore::write_with_eviction`]).
//!
//! # Example
//!
//! ```rust
//! use foodlog_store::{DurableStore, Profile};
//! use foodlog_core::models::UserProfile;
//!
//! let store = DurableStore::in_memory();
//! let profile = UserProfile { age: Some(30), ..UserProfile::default() };
//! store.write::<Profile>(&profile).unwrap();
//! assert_eq!(store.read::<Profile>(), profile);
//! ```

#![warn(clippy::all)]

mod backend;
mod error;
mod eviction;
mod file;
mod memory;
mod namespace;
mod store;

pub use backend::{StorageBackend, StorageUsage};
pub use error::{BackendError, Result, StoreError};
pub use eviction::{eviction_count, trim_oldest};
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use namespace::{FoodLog, Namespace, NotificationSettingsNs, Profile, WaterLog, ALL_KEYS};
pub use store::DurableStore;
