//! Configuration schema definitions

use crate::error::{Error, Result};
use crate::metrics::BmrFormula;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    #[serde(default)]
    pub image: ImageConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ConfigSchema {
    /// Check every section's value ranges.
    pub fn validate(&self) -> Result<()> {
        self.image.validate()?;
        self.store.validate()?;
        self.metrics.validate()
    }
}

/// Photo compression settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// JPEG quality for interactively cropped photos (1-100)
    #[serde(default = "default_crop_quality")]
    pub crop_quality: u8,

    /// JPEG quality for the bounded full-photo path (1-100)
    #[serde(default = "default_full_quality")]
    pub full_quality: u8,

    /// Longest edge in pixels for the bounded full-photo path
    #[serde(default = "default_max_edge")]
    pub max_edge: u32,

    /// Device pixel density applied to cropped output
    #[serde(default = "default_pixel_ratio")]
    pub pixel_ratio: f32,

    /// Soft ceiling on encoded size in bytes (0 disables it)
    #[serde(default = "default_soft_max_bytes")]
    pub soft_max_bytes: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            crop_quality: default_crop_quality(),
            full_quality: default_full_quality(),
            max_edge: default_max_edge(),
            pixel_ratio: default_pixel_ratio(),
            soft_max_bytes: default_soft_max_bytes(),
        }
    }
}

impl ImageConfig {
    fn validate(&self) -> Result<()> {
        for (field, quality) in [("image.crop_quality", self.crop_quality), ("image.full_quality", self.full_quality)] {
            if !(1..=100).contains(&quality) {
                return Err(Error::config_invalid(field, format!("quality must be 1-100, got {quality}")));
            }
        }
        if self.max_edge == 0 {
            return Err(Error::config_invalid("image.max_edge", "max_edge must be positive"));
        }
        if !self.pixel_ratio.is_finite() || self.pixel_ratio <= 0.0 || self.pixel_ratio > 4.0 {
            return Err(Error::config_invalid(
                "image.pixel_ratio",
                format!("pixel_ratio must be in (0, 4], got {}", self.pixel_ratio),
            ));
        }
        Ok(())
    }
}

fn default_crop_quality() -> u8 {
    20
}

fn default_full_quality() -> u8 {
    85
}

fn default_max_edge() -> u32 {
    1024
}

fn default_pixel_ratio() -> f32 {
    1.0
}

fn default_soft_max_bytes() -> usize {
    256 * 1024
}

/// Which storage medium backs the durable store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Byte-budgeted in-process map
    Memory,
    /// One JSON file per namespace
    #[default]
    File,
}

/// Durable store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// Directory for the file backend
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Storage budget shared by all namespaces
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: u64,

    /// Share of the oldest collection entries dropped on quota recovery
    #[serde(default = "default_eviction_fraction")]
    pub eviction_fraction: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            data_dir: default_data_dir(),
            quota_bytes: default_quota_bytes(),
            eviction_fraction: default_eviction_fraction(),
        }
    }
}

impl StoreConfig {
    fn validate(&self) -> Result<()> {
        if self.quota_bytes == 0 {
            return Err(Error::config_invalid("store.quota_bytes", "quota_bytes must be positive"));
        }
        if !(self.eviction_fraction > 0.0 && self.eviction_fraction <= 1.0) {
            return Err(Error::config_invalid(
                "store.eviction_fraction",
                format!("eviction_fraction must be in (0, 1], got {}", self.eviction_fraction),
            ));
        }
        Ok(())
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from(".data"))
        .join("foodlog")
}

fn default_quota_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_eviction_fraction() -> f64 {
    0.2
}

/// Derived metrics settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub bmr_formula: BmrFormula,

    /// kcal added for a gain goal and removed for a loss goal
    #[serde(default = "default_goal_offset")]
    pub goal_offset_kcal: f64,

    #[serde(default = "default_water_ml_per_kg")]
    pub water_ml_per_kg: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            bmr_formula: BmrFormula::default(),
            goal_offset_kcal: default_goal_offset(),
            water_ml_per_kg: default_water_ml_per_kg(),
        }
    }
}

impl MetricsConfig {
    fn validate(&self) -> Result<()> {
        if !self.goal_offset_kcal.is_finite() || self.goal_offset_kcal < 0.0 {
            return Err(Error::config_invalid("metrics.goal_offset_kcal", "goal_offset_kcal must be zero or more"));
        }
        if !self.water_ml_per_kg.is_finite() || self.water_ml_per_kg <= 0.0 {
            return Err(Error::config_invalid("metrics.water_ml_per_kg", "water_ml_per_kg must be positive"));
        }
        Ok(())
    }
}

fn default_goal_offset() -> f64 {
    300.0
}

fn default_water_ml_per_kg() -> f64 {
    35.0
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of compact text
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
