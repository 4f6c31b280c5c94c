//! Persisted record types
//!
//! Every type here serializes with camelCase field names so stored JSON stays
//! self-describing and can be inspected (or discarded) per namespace.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique, creation-time-ordered record identifier.
///
/// Formatted as zero-padded epoch milliseconds followed by a random suffix,
/// so lexicographic order matches creation order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Generate a new id for a record created at `at`.
    pub fn generate(at: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{:013}-{}", at.timestamp_millis().max(0), &suffix[..8]))
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Records that live in an append-only, timestamped collection.
pub trait Timestamped {
    /// Record identifier
    fn id(&self) -> &EntryId;
    /// Creation timestamp
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Structured guess returned by the estimation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionEstimate {
    /// Detected dish or food label
    pub food_item: String,
    /// Estimated kilocalories, never negative
    pub calorie_estimate: f64,
    /// Model confidence in `[0, 1]`
    pub confidence: f64,
    /// Whether the photo shows food at all
    pub is_food_item: bool,
}

impl NutritionEstimate {
    /// Check the numeric ranges promised by the estimation contract.
    pub fn validate(&self) -> Result<()> {
        if !self.calorie_estimate.is_finite() || self.calorie_estimate < 0.0 {
            return Err(Error::validation(
                "calorieEstimate",
                format!("calorie estimate out of range: {}", self.calorie_estimate),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::validation(
                "confidence",
                format!("confidence out of range: {}", self.confidence),
            ));
        }
        Ok(())
    }
}

/// Meal slot an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    /// Suggest a meal slot for a local hour of day (0-23).
    ///
    /// Only a UI default; the entry builder never applies it on its own.
    pub fn suggest_for(hour: u32) -> Self {
        match hour {
            5..=10 => MealType::Breakfast,
            11..=15 => MealType::Lunch,
            16..=21 => MealType::Dinner,
            _ => MealType::Snack,
        }
    }
}

/// Where a meal was eaten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Location {
    /// A location known only by name.
    pub fn named(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    /// Reject coordinates outside their geographic ranges.
    pub fn validate(&self) -> Result<()> {
        if let Some(lat) = self.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(Error::validation("location.latitude", format!("latitude out of range: {lat}")));
            }
        }
        if let Some(lng) = self.longitude {
            if !(-180.0..=180.0).contains(&lng) {
                return Err(Error::validation("location.longitude", format!("longitude out of range: {lng}")));
            }
        }
        Ok(())
    }
}

/// A logged meal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: EntryId,
    pub food_item: String,
    pub calorie_estimate: f64,
    /// Inline `data:` URI of the compressed photo
    pub encoded_image_ref: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<MealType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Timestamped for LogEntry {
    fn id(&self) -> &EntryId {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// A logged drink of water.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterEntry {
    pub id: EntryId,
    pub timestamp: DateTime<Utc>,
    pub amount_ml: u32,
}

impl WaterEntry {
    /// Create a water entry; the amount must be positive.
    pub fn new(amount_ml: u32, timestamp: DateTime<Utc>) -> Result<Self> {
        if amount_ml == 0 {
            return Err(Error::validation("amountMl", "water amount must be greater than zero"));
        }
        Ok(Self {
            id: EntryId::generate(timestamp),
            timestamp,
            amount_ml,
        })
    }
}

impl Timestamped for WaterEntry {
    fn id(&self) -> &EntryId {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    /// Multiplier applied to BMR to get daily energy expenditure.
    pub fn multiplier(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::VeryActive => 1.9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HealthGoal {
    LoseWeight,
    Maintain,
    GainWeight,
}

/// Body data used for derived metrics. Every field is optional and never guessed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_level: Option<ActivityLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_goal: Option<HealthGoal>,
}

impl UserProfile {
    /// Reject present-but-invalid numbers (zero, negative, NaN).
    pub fn validate(&self) -> Result<()> {
        if self.age == Some(0) {
            return Err(Error::validation("age", "age must be positive"));
        }
        for (field, value) in [("heightCm", self.height_cm), ("weightKg", self.weight_kg)] {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    return Err(Error::validation(field, format!("{field} must be a positive number, got {v}")));
                }
            }
        }
        Ok(())
    }
}

/// Reminder preferences. Missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub enabled: bool,
    /// Local times formatted `HH:MM`
    pub meal_reminders: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_reminder_interval_minutes: Option<u32>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            meal_reminders: vec!["08:00".into(), "12:30".into(), "19:00".into()],
            water_reminder_interval_minutes: None,
        }
    }
}
