//! Exercise assignment types
//!
//! An assignment links a therapist, a patient and an exercise with
//! optional targets and a status that moves forward as the patient works.

use serde::{Deserialize, Serialize};

use super::exercise::Exercise;

/// Lifecycle status of an assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Assigned,
    InProgress,
    Completed,
    Skipped,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::InProgress => "in_progress",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Skipped => "skipped",
        }
    }
}

impl std::str::FromStr for AssignmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assigned" => Ok(AssignmentStatus::Assigned),
            "in_progress" => Ok(AssignmentStatus::InProgress),
            "completed" => Ok(AssignmentStatus::Completed),
            "skipped" => Ok(AssignmentStatus::Skipped),
            other => Err(format!("Unknown assignment status: {}", other)),
        }
    }
}

/// Stored assignment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseAssignment {
    pub id: String,
    pub therapist_id: String,
    pub patient_id: String,
    pub exercise_id: String,
    pub assigned_date: String,
    pub due_date: Option<String>,
    pub target_reps: Option<u32>,
    pub target_sets: Option<u32>,
    /// Minutes
    pub target_duration: Option<u32>,
    pub notes: Option<String>,
    pub status: AssignmentStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Assignment joined with its exercise, as returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentWithExercise {
    #[serde(flatten)]
    pub assignment: ExerciseAssignment,
    pub exercise: Option<Exercise>,
}

/// Fields supplied by the therapist when assigning
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignment {
    pub therapist_id: String,
    pub patient_id: String,
    pub exercise_id: String,
    pub due_date: Option<String>,
    pub target_reps: Option<u32>,
    pub target_sets: Option<u32>,
    pub target_duration: Option<u32>,
    pub notes: Option<String>,
}

/// Partial update of an assignment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentUpdate {
    pub status: Option<AssignmentStatus>,
    pub due_date: Option<String>,
    pub target_reps: Option<u32>,
    pub target_sets: Option<u32>,
    pub target_duration: Option<u32>,
    pub notes: Option<String>,
}

impl AssignmentUpdate {
    /// Update that only moves the status
    pub fn status(status: AssignmentStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn apply(self, assignment: &mut ExerciseAssignment) {
        if let Some(v) = self.status {
            assignment.status = v;
        }
        if let Some(v) = self.due_date {
            assignment.due_date = Some(v);
        }
        if let Some(v) = self.target_reps {
            assignment.target_reps = Some(v);
        }
        if let Some(v) = self.target_sets {
            assignment.target_sets = Some(v);
        }
        if let Some(v) = self.target_duration {
            assignment.target_duration = Some(v);
        }
        if let Some(v) = self.notes {
            assignment.notes = Some(v);
        }
    }
}
