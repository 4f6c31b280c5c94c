//! Typed namespaces.

use foodlog_core::models::{LogEntry, NotificationSettings, UserProfile, WaterEntry};
use serde::{de::DeserializeOwned, Serialize};

/// An independent named record in the store.
pub trait Namespace {
    /// Key under which the value is persisted.
    const KEY: &'static str;

    /// Stored value type.
    type Value: Serialize + DeserializeOwned + Default + Send + Sync + 'static;

    /// Value returned when the namespace is absent or corrupt.
    fn default_value() -> Self::Value {
        Self::Value::default()
    }
}

/// `foodLog`: every meal entry, oldest first.
#[derive(Debug, Clone, Copy)]
pub struct FoodLog;

impl Namespace for FoodLog {
    const KEY: &'static str = "foodLog";
    type Value = Vec<LogEntry>;
}

/// `waterLog`: flat list of water entries, grouped by date on read.
#[derive(Debug, Clone, Copy)]
pub struct WaterLog;

impl Namespace for WaterLog {
    const KEY: &'static str = "waterLog";
    type Value = Vec<WaterEntry>;
}

/// `profile`: the single user profile.
#[derive(Debug, Clone, Copy)]
pub struct Profile;

impl Namespace for Profile {
    const KEY: &'static str = "profile";
    type Value = UserProfile;
}

/// `notificationSettings`: reminder preferences.
#[derive(Debug, Clone, Copy)]
pub struct NotificationSettingsNs;

impl Namespace for NotificationSettingsNs {
    const KEY: &'static str = "notificationSettings";
    type Value = NotificationSettings;
}

/// Keys of all built-in namespaces.
pub const ALL_KEYS: [&str; 4] = [FoodLog::KEY, WaterLog::KEY, Profile::KEY, NotificationSettingsNs::KEY];
