//! Weekly progress buckets
//!
//! Splits the trailing window into consecutive seven-day buckets ending
//! today, oldest first.

use chrono::{Duration as ChronoDuration, NaiveDate};

use super::{average_accuracy, parse_date, MAX_WINDOW_DAYS};
use crate::models::progress::{ProgressEntry, WeeklyProgress};

/// Number of buckets needed to cover `days`, capped at `MAX_WINDOW_DAYS`
pub fn weeks_to_show(days: u32) -> u32 {
    days.min(MAX_WINDOW_DAYS).div_ceil(7).max(1)
}

/// Bucket entries into weeks. Bucket `i` (counting back from today) covers
/// `[today + 1 - 7(i+1), today + 1 - 7i)`.
pub fn weekly_progress(entries: &[ProgressEntry], today: NaiveDate, days: u32) -> Vec<WeeklyProgress> {
    let Some(end_exclusive) = today.checked_add_signed(ChronoDuration::days(1)) else {
        return Vec::new();
    };
    let mut weeks = Vec::new();

    for i in 0..weeks_to_show(days) {
        let bounds = end_exclusive
            .checked_sub_signed(ChronoDuration::days(7 * i as i64))
            .and_then(|end| Some((end.checked_sub_signed(ChronoDuration::days(7))?, end)));
        // Stop at the start of the calendar
        let Some((week_start, week_end)) = bounds else {
            break;
        };

        let in_week: Vec<&ProgressEntry> = entries
            .iter()
            .filter(|e| {
                parse_date(&e.date)
                    .map(|d| d >= week_start && d < week_end)
                    .unwrap_or(false)
            })
            .collect();

        weeks.push(WeeklyProgress {
            week: format!(
                "{} - {}",
                week_start.format("%Y-%m-%d"),
                (week_end - ChronoDuration::days(1)).format("%Y-%m-%d")
            ),
            exercises: in_week.len() as u32,
            accuracy: average_accuracy(&in_week),
            time: in_week.iter().map(|e| e.duration as u64).sum(),
        });
    }

    weeks.reverse();
    weeks
}
