//! JSON export functionality
//!
//! Full progress records with a summary block.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::commands::format_duration;
use crate::models::progress::ProgressEntry;
use crate::CommandError;

const EXPORT_VERSION: &str = "1.0.0";

/// Summary statistics for the export
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSummary {
    pub total_time_secs: u64,
    pub total_time: String,
    pub average_accuracy: f64,
    pub average_score: f64,
    pub date_range: Option<(String, String)>,
}

/// Complete export structure for JSON
#[derive(Debug, Clone, Serialize)]
pub struct ProgressExportJson<'a> {
    pub export_date: String,
    pub export_version: &'static str,
    pub patient_id: &'a str,
    pub total_entries: usize,
    pub entries: &'a [ProgressEntry],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ProgressSummary>,
}

/// Summary over `entries`, `None` when there are none
pub fn summarize(entries: &[ProgressEntry]) -> Option<ProgressSummary> {
    if entries.is_empty() {
        return None;
    }

    let count = entries.len() as f64;
    let total_time_secs: u64 = entries.iter().map(|e| e.duration as u64).sum();
    let min_date = entries.iter().map(|e| e.date.as_str()).min();
    let max_date = entries.iter().map(|e| e.date.as_str()).max();

    Some(ProgressSummary {
        total_time_secs,
        total_time: format_duration(total_time_secs),
        average_accuracy: entries.iter().map(|e| e.accuracy).sum::<f64>() / count,
        average_score: entries.iter().map(|e| e.score).sum::<f64>() / count,
        date_range: min_date
            .zip(max_date)
            .map(|(min, max)| (min.to_string(), max.to_string())),
    })
}

/// Write progress entries to JSON format
pub fn write_progress_json(
    entries: &[ProgressEntry],
    patient_id: &str,
    path: &Path,
) -> Result<(), CommandError> {
    let export = ProgressExportJson {
        export_date: chrono::Utc::now().to_rfc3339(),
        export_version: EXPORT_VERSION,
        patient_id,
        total_entries: entries.len(),
        entries,
        summary: summarize(entries),
    };

    let json = serde_json::to_string_pretty(&export)
        .map_err(|e| CommandError::Internal(format!("Failed to serialize JSON: {}", e)))?;

    let mut file = std::fs::File::create(path)
        .map_err(|e| CommandError::Internal(format!("Failed to create JSON file: {}", e)))?;

    file.write_all(json.as_bytes())
        .map_err(|e| CommandError::Internal(format!("Failed to write JSON file: {}", e)))?;

    Ok(())
}
