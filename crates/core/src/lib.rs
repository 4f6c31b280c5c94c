//! Core domain for the foodlog workspace
//!
//! This crate holds everything that is pure and platform independent:
//!
//! - **Data model**: log entries, water entries, profile, notification settings
//! - **Entry building**: merging an estimate and user edits into a record
//! - **Derived metrics**: BMR, calorie target, BMI and water target
//! - **Error handling**: the error taxonomy shared by every crate
//! - **Configuration**: TOML-based configuration with validation
//!
//! # Example
//!
//! ```rust
//! use foodlog_core::entry::{EntryEdits, LogEntryBuilder};
//! use foodlog_core::models::NutritionEstimate;
//!
//! let estimate = NutritionEstimate {
//!     food_item: "Apple".into(),
//!     calorie_estimate: 95.0,
//!     confidence: 0.9,
//!     is_food_item: true,
//! };
//! let entry = LogEntryBuilder::build(
//!     Some(&estimate),
//!     "data:image/jpeg;base64,/9j/",
//!     EntryEdits::new(),
//!     chrono::Utc::now(),
//! )
//! .unwrap();
//! assert_eq!(entry.calorie_estimate, 95.0);
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod dates;
pub mod entry;
pub mod error;
pub mod metrics;
pub mod models;

pub use error::{Error, ErrorCode, ErrorReport, Recovery, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, ConfigSchema};
    pub use crate::entry::{EntryEdits, LogEntryBuilder, PLACEHOLDER_FOOD_ITEM};
    pub use crate::error::{Error, ErrorCode, Recovery, Result, ResultExt};
    pub use crate::metrics::{BmrFormula, HealthMetrics, MetricsCalculator};
    pub use crate::models::{
        ActivityLevel, EntryId, Gender, HealthGoal, Location, LogEntry, MealType,
        NotificationSettings, NutritionEstimate, Timestamped, UserProfile, WaterEntry,
    };
}
