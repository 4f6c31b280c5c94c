//! Log entry construction
//!
//! Merges an (optional) estimate, the user's edits and a timestamp into an
//! immutable [`LogEntry`]. Pure: no clock reads, no I/O.

use crate::error::{Error, Result};
use crate::models::{EntryId, Location, LogEntry, MealType, NutritionEstimate};
use chrono::{DateTime, Utc};

/// Label used when neither the user nor the estimate names the food.
pub const PLACEHOLDER_FOOD_ITEM: &str = "Unknown food";

/// Fields the user may set or change before committing an entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryEdits {
    pub food_item: Option<String>,
    pub calorie_estimate: Option<f64>,
    pub meal_type: Option<MealType>,
    pub location: Option<Location>,
    pub cost: Option<f64>,
    pub notes: Option<String>,
}

impl EntryEdits {
    /// No edits.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn food_item(mut self, food_item: impl Into<String>) -> Self {
        self.food_item = Some(food_item.into());
        self
    }

    #[must_use]
    pub fn calories(mut self, calories: f64) -> Self {
        self.calorie_estimate = Some(calories);
        self
    }

    #[must_use]
    pub fn meal_type(mut self, meal_type: MealType) -> Self {
        self.meal_type = Some(meal_type);
        self
    }

    #[must_use]
    pub fn location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    #[must_use]
    pub fn cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if let Some(cost) = self.cost {
            if !cost.is_finite() || cost < 0.0 {
                return Err(Error::validation("cost", format!("cost must be zero or more, got {cost}"))
                    .with_suggestion("Leave the cost empty if it is unknown"));
            }
        }
        if let Some(calories) = self.calorie_estimate {
            if !calories.is_finite() || calories < 0.0 {
                return Err(Error::validation(
                    "calorieEstimate",
                    format!("calories must be zero or more, got {calories}"),
                ));
            }
        }
        if let Some(location) = &self.location {
            location.validate()?;
        }
        Ok(())
    }
}

/// Builds [`LogEntry`] records.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEntryBuilder;

impl LogEntryBuilder {
    /// Build a new entry.
    ///
    /// A missing estimate, or one that says the photo is not food, zeroes
    /// calories and confidence but never prevents the entry from being built.
    /// A calorie value typed by the user still wins over the zeroed estimate.
    pub fn build(
        estimate: Option<&NutritionEstimate>,
        encoded_image_ref: impl Into<String>,
        edits: EntryEdits,
        timestamp: DateTime<Utc>,
    ) -> Result<LogEntry> {
        edits.validate()?;

        let encoded_image_ref = encoded_image_ref.into();
        if encoded_image_ref.trim().is_empty() {
            return Err(Error::validation("encodedImageRef", "an entry needs its encoded photo"));
        }

        let usable = estimate.filter(|e| e.is_food_item);
        let (estimated_calories, confidence) = usable
            .map_or((0.0, 0.0), |e| (e.calorie_estimate.max(0.0), e.confidence.clamp(0.0, 1.0)));

        let food_item = non_blank(edits.food_item)
            .or_else(|| estimate.and_then(|e| non_blank(Some(e.food_item.clone()))))
            .unwrap_or_else(|| PLACEHOLDER_FOOD_ITEM.to_string());

        Ok(LogEntry {
            id: EntryId::generate(timestamp),
            food_item,
            calorie_estimate: edits.calorie_estimate.unwrap_or(estimated_calories),
            encoded_image_ref,
            timestamp,
            meal_type: edits.meal_type,
            location: edits.location,
            cost: edits.cost,
            notes: non_blank(edits.notes),
            confidence: Some(confidence),
        })
    }
}

impl LogEntry {
    /// Explicit edit: returns a whole replacement record with the same id and timestamp.
    pub fn edited(&self, edits: EntryEdits) -> Result<LogEntry> {
        edits.validate()?;

        let mut next = self.clone();
        if let Some(food_item) = non_blank(edits.food_item) {
            next.food_item = food_item;
        }
        if let Some(calories) = edits.calorie_estimate {
            next.calorie_estimate = calories;
        }
        if edits.meal_type.is_some() {
            next.meal_type = edits.meal_type;
        }
        if edits.location.is_some() {
            next.location = edits.location;
        }
        if edits.cost.is_some() {
            next.cost = edits.cost;
        }
        if let Some(notes) = edits.notes {
            next.notes = non_blank(Some(notes));
        }
        Ok(next)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const IMAGE: &str = "data:image/jpeg;base64,/9j/4AAQ";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    fn estimate(is_food: bool) -> NutritionEstimate {
        NutritionEstimate {
            food_item: "Margherita pizza".into(),
            calorie_estimate: 500.0,
            confidence: 0.7,
            is_food_item: is_food,
        }
    }

    #[test]
    fn test_food_estimate_is_carried_over() {
        let entry = LogEntryBuilder::build(Some(&estimate(true)), IMAGE, EntryEdits::new(), now()).unwrap();
        assert_eq!(entry.food_item, "Margherita pizza");
        assert_eq!(entry.calorie_estimate, 500.0);
        assert_eq!(entry.confidence, Some(0.7));
        assert_eq!(entry.timestamp, now());
    }

    #[test]
    fn test_non_food_estimate_zeroes_nutrition_but_keeps_label() {
        let entry = LogEntryBuilder::build(Some(&estimate(false)), IMAGE, EntryEdits::new(), now()).unwrap();
        assert_eq!(entry.calorie_estimate, 0.0);
        assert_eq!(entry.confidence, Some(0.0));
        assert_eq!(entry.food_item, "Margherita pizza");
    }

    #[test]
    fn test_missing_estimate_uses_placeholder() {
        let entry = LogEntryBuilder::build(None, IMAGE, EntryEdits::new(), now()).unwrap();
        assert_eq!(entry.food_item, PLACEHOLDER_FOOD_ITEM);
        assert_eq!(entry.calorie_estimate, 0.0);
        assert_eq!(entry.confidence, Some(0.0));
    }

    #[test]
    fn test_blank_label_falls_back_to_placeholder() {
        let mut blank = estimate(true);
        blank.food_item = "   ".into();
        let entry = LogEntryBuilder::build(Some(&blank), IMAGE, EntryEdits::new(), now()).unwrap();
        assert_eq!(entry.food_item, PLACEHOLDER_FOOD_ITEM);
    }

    #[test]
    fn test_user_edits_win() {
        let edits = EntryEdits::new()
            .food_item("Leftover pizza")
            .calories(350.0)
            .meal_type(MealType::Dinner)
            .cost(4.5)
            .notes("half portion");
        let entry = LogEntryBuilder::build(Some(&estimate(false)), IMAGE, edits, now()).unwrap();

        assert_eq!(entry.food_item, "Leftover pizza");
        assert_eq!(entry.calorie_estimate, 350.0);
        assert_eq!(entry.confidence, Some(0.0));
        assert_eq!(entry.meal_type, Some(MealType::Dinner));
        assert_eq!(entry.cost, Some(4.5));
        assert_eq!(entry.notes.as_deref(), Some("half portion"));
    }

    #[test]
    fn test_optional_fields_absent_unless_supplied() {
        let entry = LogEntryBuilder::build(Some(&estimate(true)), IMAGE, EntryEdits::new(), now()).unwrap();
        assert!(entry.meal_type.is_none());
        assert!(entry.location.is_none());
        assert!(entry.cost.is_none());
        assert!(entry.notes.is_none());
    }

    #[test]
    fn test_negative_cost_rejected() {
        let result = LogEntryBuilder::build(None, IMAGE, EntryEdits::new().cost(-1.0), now());
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_image_ref_rejected() {
        assert!(LogEntryBuilder::build(None, "", EntryEdits::new(), now()).is_err());
    }

    #[test]
    fn test_edit_replaces_fields_and_keeps_identity() {
        let entry = LogEntryBuilder::build(Some(&estimate(true)), IMAGE, EntryEdits::new(), now()).unwrap();
        let edited = entry
            .edited(EntryEdits::new().food_item("Calzone").location(Location::named("Luigi's")))
            .unwrap();

        assert_eq!(edited.id, entry.id);
        assert_eq!(edited.timestamp, entry.timestamp);
        assert_eq!(edited.food_item, "Calzone");
        assert_eq!(edited.calorie_estimate, 500.0);
        assert_eq!(edited.location, Some(Location::named("Luigi's")));
    }
}
