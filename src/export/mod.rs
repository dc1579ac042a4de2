//! Export module for CSV and JSON export functionality
//!
//! Exports a patient's progress entries in CSV (one flat row per entry) or
//! JSON (full records plus a summary) to the user's download directory.

pub mod csv_export;
pub mod json_export;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::commands::format_duration;
use crate::db::queries;
use crate::models::progress::ProgressEntry;
use crate::{AppState, CommandError};

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(CommandError::BadRequest(format!(
                "Invalid export format: {}. Use 'csv' or 'json'",
                s
            ))),
        }
    }
}

impl ExportFormat {
    /// Get file extension for format
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Flat progress row for CSV
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportableProgress {
    pub id: String,
    pub date: String,
    pub exercise_name: String,
    pub assignment_id: Option<String>,
    pub duration_secs: u32,
    pub duration: String,
    pub accuracy: f64,
    pub score: f64,
    pub reps: Option<u32>,
    pub sets: Option<u32>,
    pub feedback: String, // "; "-separated
}

impl From<&ProgressEntry> for ExportableProgress {
    fn from(entry: &ProgressEntry) -> Self {
        Self {
            id: entry.id.clone(),
            date: entry.date.clone(),
            exercise_name: entry.exercise_name.clone(),
            assignment_id: entry.exercise_assignment_id.clone(),
            duration_secs: entry.duration,
            duration: format_duration(entry.duration as u64),
            accuracy: entry.accuracy,
            score: entry.score,
            reps: entry.reps,
            sets: entry.sets,
            feedback: entry.feedback.join("; "),
        }
    }
}

/// Get the default export directory (Downloads folder or temp dir)
pub fn get_export_directory() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::document_dir)
        .unwrap_or_else(std::env::temp_dir)
}

/// Generate a timestamped filename for exports
pub fn generate_export_filename(prefix: &str, extension: &str) -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    format!("{}_{}.{}", prefix, timestamp, extension)
}

/// Write `entries` into `dir` and return the file path
pub fn write_progress_export(
    entries: &[ProgressEntry],
    patient_id: &str,
    format: ExportFormat,
    dir: &Path,
) -> Result<PathBuf, CommandError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| CommandError::Internal(format!("Failed to create export directory: {}", e)))?;

    let prefix = format!("progress_{}", patient_id);
    let path = dir.join(generate_export_filename(&prefix, format.extension()));

    match format {
        ExportFormat::Csv => {
            let rows: Vec<ExportableProgress> = entries.iter().map(ExportableProgress::from).collect();
            write_progress_csv(&rows, &path)?;
        }
        ExportFormat::Json => write_progress_json(entries, patient_id, &path)?,
    }

    tracing::info!("Exported {} progress entries to {:?}", entries.len(), path);
    Ok(path)
}

/// Export a patient's progress to the download directory
pub fn export_progress(
    state: &AppState,
    caller: Option<&str>,
    patient_id: &str,
    format: &str,
) -> Result<PathBuf, CommandError> {
    if caller.map_or(true, str::is_empty) {
        return Err(CommandError::Unauthorized);
    }
    let format: ExportFormat = format.parse()?;

    let entries = state
        .db
        .with_connection(|conn| queries::get_progress_by_patient_id(conn, patient_id))?;

    write_progress_export(&entries, patient_id, format, &get_export_directory())
}

// Re-export writers
pub use csv_export::*;
pub use json_export::*;
