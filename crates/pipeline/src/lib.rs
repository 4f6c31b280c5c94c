//! End-to-end meal logging for foodlog
//!
//! Ties the other crates together: a photo is captured or uploaded, cropped,
//! rasterized to a compact JPEG, sent to the estimation service, merged with
//! the user's edits into a [`LogEntry`](foodlog_core::models::LogEntry) and
//! appended to the durable store.
//!
//! ```rust,no_run
//! use foodlog_core::config::Config;
//! use foodlog_core::entry::EntryEdits;
//! use foodlog_estimation::HttpEstimationGateway;
//! use foodlog_pipeline::{MealLogger, PhotoDraft, QuotaPolicy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(None)?;
//!     foodlog_telemetry::init_with_config((&config.schema.logging).into())?;
//!
//!     let logger = MealLogger::from_config(&config.schema, HttpEstimationGateway::from_env()?)?;
//!     let draft = PhotoDraft::from_bytes(&std::fs::read("lunch.jpg")?)?;
//!     let meal = logger
//!         .log_meal(&draft, EntryEdits::new(), chrono::Utc::now(), QuotaPolicy::EvictOldest)
//!         .await?;
//!     println!("{} ({} kcal)", meal.entry.food_item, meal.entry.calorie_estimate);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod camera;
pub mod error;
pub mod journal;
pub mod meal;

pub use camera::{CameraDevice, CameraError, CameraSession};
pub use error::{PipelineError, Result};
pub use journal::{Journal, QuotaPolicy, SaveReport};
pub use meal::{EstimateOutcome, LoggedMeal, MealLogger, PhotoDraft};
