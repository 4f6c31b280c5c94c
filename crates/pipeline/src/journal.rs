//! Store-facing operations: entries, water, profile, settings and metrics.

use crate::error::{PipelineError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use foodlog_core::dates;
use foodlog_core::entry::EntryEdits;
use foodlog_core::metrics::{HealthMetrics, MetricsCalculator};
use foodlog_core::models::{EntryId, LogEntry, NotificationSettings, UserProfile, WaterEntry};
use foodlog_store::{DurableStore, FoodLog, NotificationSettingsNs, Profile, WaterLog};
use foodlog_telemetry::{metrics, names};
use std::collections::BTreeMap;
use std::sync::Arc;

/// What to do when a collection write hits the storage quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuotaPolicy {
    /// Surface `QuotaExceeded`; nothing is saved
    #[default]
    Fail,
    /// Drop the oldest entries once and retry
    EvictOldest,
}

/// Result of saving a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveReport {
    /// Old entries dropped to make room
    pub evicted: usize,
}

/// Typed access to everything the user has logged.
#[derive(Debug, Clone)]
pub struct Journal {
    store: Arc<DurableStore>,
    calculator: MetricsCalculator,
}

impl Journal {
    pub fn new(store: Arc<DurableStore>, calculator: MetricsCalculator) -> Self {
        Self { store, calculator }
    }

    pub fn store(&self) -> &Arc<DurableStore> {
        &self.store
    }

    /// Persist a freshly built entry. On error nothing was appended.
    pub fn save_entry(&self, entry: LogEntry, policy: QuotaPolicy) -> Result<SaveReport> {
        let id = entry.id.clone();
        let report = self.append::<FoodLog, _>(entry, policy)?;
        metrics().increment(names::ENTRIES_SAVED);
        tracing::info!(id = %id, evicted = report.evicted, "Meal entry saved");
        Ok(report)
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.store.read::<FoodLog>()
    }

    pub fn entry(&self, id: &EntryId) -> Option<LogEntry> {
        self.entries().into_iter().find(|e| &e.id == id)
    }

    /// Entries logged on a UTC calendar date.
    pub fn entries_on(&self, date: NaiveDate) -> Vec<LogEntry> {
        let all = self.entries();
        dates::entries_on(&all, date).into_iter().cloned().collect()
    }

    pub fn calories_by_date(&self) -> BTreeMap<NaiveDate, f64> {
        dates::calories_by_date(&self.entries())
    }

    /// Apply user edits to a stored entry and replace it.
    pub fn edit_entry(&self, id: &EntryId, edits: EntryEdits) -> Result<LogEntry> {
        let current = self.entry(id).ok_or_else(|| PipelineError::NotFound(id.clone()))?;
        let updated = current.edited(edits)?;
        if !self.store.replace_entry::<FoodLog, _>(updated.clone())? {
            return Err(PipelineError::NotFound(id.clone()));
        }
        tracing::info!(id = %id, "Meal entry edited");
        Ok(updated)
    }

    pub fn delete_entry(&self, id: &EntryId) -> Result<()> {
        if self.store.delete_entry::<FoodLog, LogEntry>(id)? {
            tracing::info!(id = %id, "Meal entry deleted");
            Ok(())
        } else {
            Err(PipelineError::NotFound(id.clone()))
        }
    }

    /// Record a drink of water.
    pub fn log_water(&self, amount_ml: u32, timestamp: DateTime<Utc>, policy: QuotaPolicy) -> Result<WaterEntry> {
        let entry = WaterEntry::new(amount_ml, timestamp)?;
        self.append::<WaterLog, _>(entry.clone(), policy)?;
        metrics().increment(names::WATER_SAVED);
        tracing::debug!(id = %entry.id, amount_ml, "Water logged");
        Ok(entry)
    }

    pub fn water_entries(&self) -> Vec<WaterEntry> {
        self.store.read::<WaterLog>()
    }

    pub fn water_on(&self, date: NaiveDate) -> Vec<WaterEntry> {
        let all = self.water_entries();
        dates::entries_on(&all, date).into_iter().cloned().collect()
    }

    /// Total millilitres per date.
    pub fn water_by_date(&self) -> BTreeMap<NaiveDate, u64> {
        dates::water_by_date(&self.water_entries())
    }

    pub fn delete_water(&self, id: &EntryId) -> Result<()> {
        if self.store.delete_entry::<WaterLog, WaterEntry>(id)? {
            Ok(())
        } else {
            Err(PipelineError::NotFound(id.clone()))
        }
    }

    pub fn profile(&self) -> UserProfile {
        self.store.read::<Profile>()
    }

    /// Validate and store the profile.
    pub fn update_profile(&self, profile: &UserProfile) -> Result<()> {
        profile.validate()?;
        self.store.write::<Profile>(profile)?;
        Ok(())
    }

    /// Metrics for the stored profile, recomputed on every call.
    pub fn health_metrics(&self) -> HealthMetrics {
        self.calculator.compute(&self.profile())
    }

    pub fn notification_settings(&self) -> NotificationSettings {
        self.store.read::<NotificationSettingsNs>()
    }

    pub fn update_notification_settings(&self, settings: &NotificationSettings) -> Result<()> {
        self.store.write::<NotificationSettingsNs>(settings)?;
        Ok(())
    }

    fn append<N, T>(&self, entry: T, policy: QuotaPolicy) -> Result<SaveReport>
    where
        N: foodlog_store::Namespace<Value = Vec<T>>,
        T: foodlog_core::models::Timestamped,
    {
        let result = match policy {
            QuotaPolicy::Fail => self.store.append_entry::<N, T>(entry).map(|()| 0),
            QuotaPolicy::EvictOldest => self.store.append_with_eviction::<N, T>(entry),
        };

        if let Ok(usage) = self.store.usage() {
            metrics().gauge(names::STORE_USED_BYTES, usage.used_bytes);
        }

        match result {
            Ok(evicted) => {
                if evicted > 0 {
                    metrics().increment_by(names::ENTRIES_EVICTED, evicted as u64);
                }
                Ok(SaveReport { evicted })
            }
            Err(e) => {
                if e.is_quota_exceeded() {
                    metrics().increment(names::QUOTA_EXCEEDED);
                    tracing::warn!(namespace = N::KEY, error = %e, "Write rejected by storage quota");
                }
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use foodlog_core::entry::LogEntryBuilder;
    use foodlog_core::models::{ActivityLevel, Gender};

    fn journal() -> Journal {
        Journal::new(Arc::new(DurableStore::in_memory()), MetricsCalculator::default())
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
    }

    fn meal(food: &str, calories: f64, ts: DateTime<Utc>) -> LogEntry {
        LogEntryBuilder::build(
            None,
            "data:image/jpeg;base64,/9j/",
            EntryEdits::new().food_item(food).calories(calories),
            ts,
        )
        .unwrap()
    }

    #[test]
    fn test_save_edit_delete() {
        let journal = journal();
        let entry = meal("Toast", 180.0, at(1, 8));
        journal.save_entry(entry.clone(), QuotaPolicy::Fail).unwrap();

        let edited = journal
            .edit_entry(&entry.id, EntryEdits::new().food_item("Avocado toast").cost(6.5))
            .unwrap();
        assert_eq!(edited.id, entry.id);
        assert_eq!(journal.entry(&entry.id).unwrap().food_item, "Avocado toast");

        journal.delete_entry(&entry.id).unwrap();
        assert!(matches!(journal.delete_entry(&entry.id), Err(PipelineError::NotFound(_))));
        assert!(journal.entries().is_empty());
    }

    #[test]
    fn test_invalid_edit_keeps_entry() {
        let journal = journal();
        let entry = meal("Soup", 250.0, at(1, 12));
        journal.save_entry(entry.clone(), QuotaPolicy::Fail).unwrap();

        assert!(journal.edit_entry(&entry.id, EntryEdits::new().cost(-1.0)).is_err());
        assert_eq!(journal.entry(&entry.id), Some(entry));
    }

    #[test]
    fn test_grouping_by_date() {
        let journal = journal();
        journal.save_entry(meal("Eggs", 200.0, at(1, 8)), QuotaPolicy::Fail).unwrap();
        journal.save_entry(meal("Pasta", 650.0, at(1, 19)), QuotaPolicy::Fail).unwrap();
        journal.save_entry(meal("Salad", 300.0, at(2, 13)), QuotaPolicy::Fail).unwrap();

        let june_first = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(journal.entries_on(june_first).len(), 2);
        assert_eq!(journal.calories_by_date()[&june_first], 850.0);
    }

    #[test]
    fn test_water() {
        let journal = journal();
        journal.log_water(250, at(3, 9), QuotaPolicy::Fail).unwrap();
        let second = journal.log_water(500, at(3, 15), QuotaPolicy::Fail).unwrap();
        assert!(journal.log_water(0, at(3, 16), QuotaPolicy::Fail).is_err());

        let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        assert_eq!(journal.water_on(day).len(), 2);
        assert_eq!(journal.water_by_date()[&day], 750);

        journal.delete_water(&second.id).unwrap();
        assert_eq!(journal.water_by_date()[&day], 250);
    }

    #[test]
    fn test_profile_and_metrics() {
        let journal = journal();
        assert_eq!(journal.health_metrics().bmr, None);

        let profile = UserProfile {
            age: Some(30),
            gender: Some(Gender::Male),
            height_cm: Some(180.0),
            weight_kg: Some(80.0),
            activity_level: Some(ActivityLevel::Moderate),
            health_goal: None,
        };
        journal.update_profile(&profile).unwrap();

        let metrics = journal.health_metrics();
        assert!((metrics.bmi.unwrap() - 24.69).abs() < 0.01);
        assert_eq!(metrics.recommended_water_ml, Some(2800));
        assert!(metrics.daily_calorie_target.is_some());

        let invalid = UserProfile {
            weight_kg: Some(-3.0),
            ..UserProfile::default()
        };
        assert!(journal.update_profile(&invalid).is_err());
        assert_eq!(journal.profile(), profile);
    }

    #[test]
    fn test_notification_settings() {
        let journal = journal();
        let mut settings = journal.notification_settings();
        assert!(!settings.enabled);

        settings.enabled = true;
        settings.water_reminder_interval_minutes = Some(90);
        journal.update_notification_settings(&settings).unwrap();
        assert_eq!(journal.notification_settings(), settings);
    }
}
