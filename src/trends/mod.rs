//! Progress analytics module
//!
//! Summarizes a patient's progress entries over a trailing window:
//! - Totals (exercise count, time spent, mean accuracy)
//! - Per-exercise frequency
//! - Weekly buckets for charts

pub mod weekly;

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate, Utc};

use crate::models::progress::{PatientAnalytics, ProgressEntry};

/// Longest trailing window accepted for analytics, roughly ten years
pub const MAX_WINDOW_DAYS: u32 = 3660;

/// Parse a date string in YYYY-MM-DD format
pub fn parse_date(date_str: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()
}

/// Get current date as YYYY-MM-DD string
pub fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Inclusive `(start, end)` date strings covering the last `days` days.
/// `None` when the start would fall outside the calendar.
pub fn date_range(today: NaiveDate, days: u32) -> Option<(String, String)> {
    let start = today.checked_sub_days(Days::new(days as u64))?;
    Some((
        start.format("%Y-%m-%d").to_string(),
        today.format("%Y-%m-%d").to_string(),
    ))
}

/// Mean accuracy of a set of entries, 0 when empty
pub fn average_accuracy(entries: &[&ProgressEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    entries.iter().map(|e| e.accuracy).sum::<f64>() / entries.len() as f64
}

/// Build analytics from entries already restricted to the window
pub fn compute_patient_analytics(
    entries: &[ProgressEntry],
    today: NaiveDate,
    days: u32,
) -> PatientAnalytics {
    let refs: Vec<&ProgressEntry> = entries.iter().collect();

    let mut exercise_frequency: BTreeMap<String, u32> = BTreeMap::new();
    for entry in entries {
        *exercise_frequency.entry(entry.exercise_name.clone()).or_insert(0) += 1;
    }

    PatientAnalytics {
        total_exercises: entries.len() as u32,
        total_time: entries.iter().map(|e| e.duration as u64).sum(),
        average_accuracy: average_accuracy(&refs),
        exercise_frequency,
        weekly_progress: weekly::weekly_progress(entries, today, days),
    }
}
