//! Derived health metrics
//!
//! Pure functions of a [`UserProfile`]. Nothing is cached; every call
//! recomputes from the fields it is given. A `None` result means
//! "insufficient data" and must not be read as zero.

use crate::config::MetricsConfig;
use crate::models::{Gender, HealthGoal, UserProfile};
use serde::{Deserialize, Serialize};

/// Which BMR equation to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmrFormula {
    /// Revised Harris-Benedict (Roza & Shizgal, 1984)
    #[default]
    HarrisBenedict,
    /// Mifflin-St Jeor (1990). Reproduces the 1780 kcal BMR / 2759 kcal target
    /// reference figures; the default gives 1853.6 kcal BMR for the same profile.
    MifflinStJeor,
}

impl BmrFormula {
    fn apply(self, gender: Gender, kg: f64, cm: f64, age: f64) -> Option<f64> {
        match (self, gender) {
            (BmrFormula::HarrisBenedict, Gender::Male) => {
                Some(88.362 + 13.397 * kg + 4.799 * cm - 5.677 * age)
            }
            (BmrFormula::HarrisBenedict, Gender::Female) => {
                Some(447.593 + 9.247 * kg + 3.098 * cm - 4.330 * age)
            }
            (BmrFormula::MifflinStJeor, Gender::Male) => Some(10.0 * kg + 6.25 * cm - 5.0 * age + 5.0),
            (BmrFormula::MifflinStJeor, Gender::Female) => {
                Some(10.0 * kg + 6.25 * cm - 5.0 * age - 161.0)
            }
            // No equation is defined for other genders.
            (_, Gender::Other) => None,
        }
    }
}

/// All four derived metrics for one profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    pub bmr: Option<f64>,
    pub daily_calorie_target: Option<f64>,
    pub bmi: Option<f64>,
    pub recommended_water_ml: Option<u32>,
}

/// Computes [`HealthMetrics`] with a configurable formula and goal offset.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsCalculator {
    formula: BmrFormula,
    goal_offset_kcal: f64,
    water_ml_per_kg: f64,
}

impl Default for MetricsCalculator {
    fn default() -> Self {
        Self::from_config(&MetricsConfig::default())
    }
}

impl MetricsCalculator {
    /// Build a calculator from the `[metrics]` configuration section.
    pub fn from_config(config: &MetricsConfig) -> Self {
        Self {
            formula: config.bmr_formula,
            goal_offset_kcal: config.goal_offset_kcal,
            water_ml_per_kg: config.water_ml_per_kg,
        }
    }

    /// Same settings with a different BMR equation.
    #[must_use]
    pub fn with_formula(mut self, formula: BmrFormula) -> Self {
        self.formula = formula;
        self
    }

    /// Basal metabolic rate in kcal/day.
    ///
    /// Needs weight, height, age and a male or female gender.
    pub fn bmr(&self, profile: &UserProfile) -> Option<f64> {
        let kg = positive(profile.weight_kg)?;
        let cm = positive(profile.height_cm)?;
        let age = profile.age.filter(|a| *a > 0)?;
        self.formula.apply(profile.gender?, kg, cm, f64::from(age))
    }

    /// BMR times activity multiplier, shifted by the health goal offset.
    pub fn daily_calorie_target(&self, profile: &UserProfile) -> Option<f64> {
        let bmr = self.bmr(profile)?;
        let activity = profile.activity_level?;
        let offset = match profile.health_goal {
            Some(HealthGoal::LoseWeight) => -self.goal_offset_kcal,
            Some(HealthGoal::GainWeight) => self.goal_offset_kcal,
            Some(HealthGoal::Maintain) | None => 0.0,
        };
        Some(bmr * activity.multiplier() + offset)
    }

    /// Body mass index: kg / m².
    pub fn bmi(&self, profile: &UserProfile) -> Option<f64> {
        let kg = positive(profile.weight_kg)?;
        let m = positive(profile.height_cm)? / 100.0;
        Some(kg / (m * m))
    }

    /// Daily water target in millilitres.
    pub fn recommended_water_ml(&self, profile: &UserProfile) -> Option<u32> {
        let kg = positive(profile.weight_kg)?;
        let ml = (kg * self.water_ml_per_kg).round();
        (ml >= 0.0 && ml <= f64::from(u32::MAX)).then_some(ml as u32)
    }

    /// Compute every metric at once.
    pub fn compute(&self, profile: &UserProfile) -> HealthMetrics {
        HealthMetrics {
            bmr: self.bmr(profile),
            daily_calorie_target: self.daily_calorie_target(profile),
            bmi: self.bmi(profile),
            recommended_water_ml: self.recommended_water_ml(profile),
        }
    }
}

/// [`MetricsCalculator::bmr`] with default settings.
pub fn bmr(profile: &UserProfile) -> Option<f64> {
    MetricsCalculator::default().bmr(profile)
}

/// [`MetricsCalculator::daily_calorie_target`] with default settings.
pub fn daily_calorie_target(profile: &UserProfile) -> Option<f64> {
    MetricsCalculator::default().daily_calorie_target(profile)
}

/// [`MetricsCalculator::bmi`] with default settings.
pub fn bmi(profile: &UserProfile) -> Option<f64> {
    MetricsCalculator::default().bmi(profile)
}

/// [`MetricsCalculator::recommended_water_ml`] with default settings.
pub fn recommended_water_ml(profile: &UserProfile) -> Option<u32> {
    MetricsCalculator::default().recommended_water_ml(profile)
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}
