//! Calendar-day grouping for the flat log collections
//!
//! Collections are stored flat with a timestamp per record; the views group
//! them by UTC calendar date on demand.

use crate::models::{LogEntry, Timestamped, WaterEntry};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Records whose timestamp falls on `date`, in stored order.
pub fn entries_on<T: Timestamped>(entries: &[T], date: NaiveDate) -> Vec<&T> {
    entries
        .iter()
        .filter(|e| e.timestamp().date_naive() == date)
        .collect()
}

/// Total calories per day.
pub fn calories_by_date(entries: &[LogEntry]) -> BTreeMap<NaiveDate, f64> {
    entries.iter().fold(BTreeMap::new(), |mut totals, entry| {
        *totals.entry(entry.timestamp.date_naive()).or_insert(0.0) += entry.calorie_estimate;
        totals
    })
}

/// Total water per day in millilitres.
pub fn water_by_date(entries: &[WaterEntry]) -> BTreeMap<NaiveDate, u64> {
    entries.iter().fold(BTreeMap::new(), |mut totals, entry| {
        *totals.entry(entry.timestamp.date_naive()).or_insert(0) += u64::from(entry.amount_ml);
        totals
    })
}
