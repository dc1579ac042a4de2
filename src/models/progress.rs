//! Progress tracking types
//!
//! A progress entry records one completed exercise session for a patient.
//! Analytics types summarize entries over a trailing window of days.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::pose::Landmark;

/// Detailed analysis attached to a progress entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoAnalysisData {
    pub individual_scores: BTreeMap<String, f64>,
    pub pose_landmarks: Vec<Landmark>,
    pub exercise_specific_feedback: Vec<String>,
}

/// Stored progress record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    pub id: String,
    pub patient_id: String,
    pub exercise_assignment_id: Option<String>,
    /// YYYY-MM-DD
    pub date: String,
    pub exercise_name: String,
    /// Seconds
    pub duration: u32,
    /// 0-100
    pub accuracy: f64,
    /// 0-1
    pub score: f64,
    pub reps: Option<u32>,
    pub sets: Option<u32>,
    pub feedback: Vec<String>,
    pub video_analysis_data: Option<VideoAnalysisData>,
    pub created_at: String,
}

/// Fields supplied when recording progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProgressEntry {
    pub patient_id: String,
    pub exercise_assignment_id: Option<String>,
    pub exercise_name: String,
    pub duration: u32,
    pub accuracy: f64,
    pub score: f64,
    pub reps: Option<u32>,
    pub sets: Option<u32>,
    #[serde(default)]
    pub feedback: Vec<String>,
    pub video_analysis_data: Option<VideoAnalysisData>,
}

/// One week's bucket of progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyProgress {
    /// "start - end" label
    pub week: String,
    pub exercises: u32,
    pub accuracy: f64,
    /// Seconds
    pub time: u64,
}

/// Aggregates over the trailing window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientAnalytics {
    pub total_exercises: u32,
    pub total_time: u64,
    pub average_accuracy: f64,
    pub exercise_frequency: BTreeMap<String, u32>,
    pub weekly_progress: Vec<WeeklyProgress>,
}
