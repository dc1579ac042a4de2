//! Portal commands
//!
//! Each command takes the authenticated caller's user id (`None` when the
//! request carried no identity) and the shared `AppState`, checks access,
//! and runs against the store. Errors map to HTTP-style statuses through
//! `CommandError::status`.

use serde::{Deserialize, Serialize};

use crate::db::{queries, DbError};
use crate::models::assignment::{
    AssignmentStatus, AssignmentUpdate, AssignmentWithExercise, ExerciseAssignment, NewAssignment,
};
use crate::models::exercise::Exercise;
use crate::models::patient::{NewPatient, Patient, PatientUpdate};
use crate::models::progress::{NewProgressEntry, PatientAnalytics, ProgressEntry};
use crate::models::relation::TherapistPatientRelation;
use crate::models::therapist::{NewTherapist, Therapist};
use crate::trends;
use crate::{AppState, CommandError};

/// Trailing window used for analytics when the caller gives none
pub const DEFAULT_ANALYTICS_DAYS: u32 = 30;

// ============================================================================
// Response Types
// ============================================================================

/// Progress entries plus analytics over the requested window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub progress_entries: Vec<ProgressEntry>,
    pub analytics: PatientAnalytics,
}

// ============================================================================
// Helpers
// ============================================================================

/// Reject requests without an identity
fn require_caller(caller: Option<&str>) -> Result<&str, CommandError> {
    match caller {
        Some(user_id) if !user_id.is_empty() => Ok(user_id),
        _ => Err(CommandError::Unauthorized),
    }
}

/// The caller's therapist profile must be `therapist_id`
fn require_therapist(
    state: &AppState,
    user_id: &str,
    therapist_id: &str,
) -> Result<Therapist, CommandError> {
    let therapist = state
        .db
        .with_connection(|conn| queries::get_therapist_by_user_id(conn, user_id))?;

    match therapist {
        Some(t) if t.id == therapist_id => Ok(t),
        _ => Err(CommandError::Forbidden("Invalid therapist".to_string())),
    }
}

fn with_exercises(
    state: &AppState,
    assignments: Vec<ExerciseAssignment>,
) -> Result<Vec<AssignmentWithExercise>, CommandError> {
    let joined = state.db.with_connection(|conn| {
        assignments
            .into_iter()
            .map(|assignment| -> Result<AssignmentWithExercise, DbError> {
                let exercise = queries::get_exercise_by_id(conn, &assignment.exercise_id)?;
                Ok(AssignmentWithExercise {
                    assignment,
                    exercise,
                })
            })
            .collect()
    })?;
    Ok(joined)
}

/// Format seconds as `1h 2m 3s`, `2m 3s` or `3s`
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

// ============================================================================
// Exercises
// ============================================================================

/// The exercise catalog
pub fn get_exercises(state: &AppState, caller: Option<&str>) -> Result<Vec<Exercise>, CommandError> {
    require_caller(caller)?;
    Ok(state.db.with_connection(queries::get_all_exercises)?)
}

// ============================================================================
// Patients
// ============================================================================

/// The caller's own patient profile
pub fn get_patient(state: &AppState, caller: Option<&str>) -> Result<Option<Patient>, CommandError> {
    let user_id = require_caller(caller)?;
    Ok(state
        .db
        .with_connection(|conn| queries::get_patient_by_user_id(conn, user_id))?)
}

/// Patients under a therapist's active care
pub fn get_patients_for_therapist(
    state: &AppState,
    caller: Option<&str>,
    therapist_id: &str,
) -> Result<Vec<Patient>, CommandError> {
    require_caller(caller)?;
    Ok(state
        .db
        .with_connection(|conn| queries::get_patients_by_therapist_id(conn, therapist_id))?)
}

pub fn create_patient(
    state: &AppState,
    caller: Option<&str>,
    new: NewPatient,
) -> Result<Patient, CommandError> {
    let user_id = require_caller(caller)?;

    let patient = state.db.with_connection(|conn| {
        if queries::get_patient_by_user_id(conn, user_id)?.is_some() {
            return Ok(None);
        }
        queries::insert_patient(conn, user_id, &new).map(Some)
    })?;

    let patient = patient
        .ok_or_else(|| CommandError::BadRequest("Patient profile already exists".to_string()))?;
    tracing::info!("Created patient {} ({})", patient.full_name(), patient.id);
    Ok(patient)
}

pub fn update_patient(
    state: &AppState,
    caller: Option<&str>,
    patient_id: &str,
    update: PatientUpdate,
) -> Result<Patient, CommandError> {
    require_caller(caller)?;
    state
        .db
        .with_connection(|conn| queries::update_patient(conn, patient_id, update))?
        .ok_or_else(|| CommandError::NotFound("Patient not found".to_string()))
}

// ============================================================================
// Therapists
// ============================================================================

/// The caller's own therapist profile
pub fn get_therapist(
    state: &AppState,
    caller: Option<&str>,
) -> Result<Option<Therapist>, CommandError> {
    let user_id = require_caller(caller)?;
    Ok(state
        .db
        .with_connection(|conn| queries::get_therapist_by_user_id(conn, user_id))?)
}

pub fn create_therapist(
    state: &AppState,
    caller: Option<&str>,
    new: NewTherapist,
) -> Result<Therapist, CommandError> {
    let user_id = require_caller(caller)?;

    let therapist = state.db.with_connection(|conn| {
        if queries::get_therapist_by_user_id(conn, user_id)?.is_some() {
            return Ok(None);
        }
        queries::insert_therapist(conn, user_id, &new).map(Some)
    })?;

    let therapist = therapist
        .ok_or_else(|| CommandError::BadRequest("Therapist profile already exists".to_string()))?;
    tracing::info!("Created therapist {}", therapist.id);
    Ok(therapist)
}

/// Make the caller (a therapist) the patient's active therapist
pub fn assign_patient(
    state: &AppState,
    caller: Option<&str>,
    therapist_id: &str,
    patient_id: &str,
    notes: Option<String>,
) -> Result<TherapistPatientRelation, CommandError> {
    let user_id = require_caller(caller)?;
    require_therapist(state, user_id, therapist_id)?;

    let relation = state.db.with_connection(|conn| {
        queries::assign_patient_to_therapist(conn, therapist_id, patient_id, notes)
    })?;
    tracing::info!("Assigned patient {} to therapist {}", patient_id, therapist_id);
    Ok(relation)
}

// ============================================================================
// Assignments
// ============================================================================

/// Assignments of a patient or of a therapist, joined with exercise details.
/// The patient id wins when both are given.
pub fn get_assignments(
    state: &AppState,
    caller: Option<&str>,
    patient_id: Option<&str>,
    therapist_id: Option<&str>,
) -> Result<Vec<AssignmentWithExercise>, CommandError> {
    require_caller(caller)?;

    let assignments = match (patient_id, therapist_id) {
        (Some(patient_id), _) => state
            .db
            .with_connection(|conn| queries::get_assignments_by_patient_id(conn, patient_id))?,
        (None, Some(therapist_id)) => state
            .db
            .with_connection(|conn| queries::get_assignments_by_therapist_id(conn, therapist_id))?,
        (None, None) => {
            return Err(CommandError::BadRequest(
                "Patient ID or Therapist ID required".to_string(),
            ))
        }
    };

    with_exercises(state, assignments)
}

pub fn create_assignment(
    state: &AppState,
    caller: Option<&str>,
    new: NewAssignment,
) -> Result<AssignmentWithExercise, CommandError> {
    let user_id = require_caller(caller)?;
    require_therapist(state, user_id, &new.therapist_id)?;

    let (assignment, exercise) = state.db.with_connection(|conn| {
        let assignment = queries::insert_assignment(conn, &new)?;
        let exercise = queries::get_exercise_by_id(conn, &assignment.exercise_id)?;
        Ok((assignment, exercise))
    })?;

    tracing::info!(
        "Assigned exercise {} to patient {}",
        assignment.exercise_id,
        assignment.patient_id
    );
    Ok(AssignmentWithExercise {
        assignment,
        exercise,
    })
}

pub fn update_assignment(
    state: &AppState,
    caller: Option<&str>,
    assignment_id: &str,
    update: AssignmentUpdate,
) -> Result<ExerciseAssignment, CommandError> {
    require_caller(caller)?;
    state
        .db
        .with_connection(|conn| queries::update_assignment(conn, assignment_id, update))?
        .ok_or_else(|| CommandError::NotFound("Assignment not found".to_string()))
}

// ============================================================================
// Progress
// ============================================================================

/// All entries for a patient plus analytics over the last `days` days
pub fn get_progress(
    state: &AppState,
    caller: Option<&str>,
    patient_id: Option<&str>,
    days: Option<u32>,
) -> Result<ProgressReport, CommandError> {
    require_caller(caller)?;
    let patient_id = patient_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| CommandError::BadRequest("Patient ID required".to_string()))?;
    let days = days.unwrap_or(DEFAULT_ANALYTICS_DAYS);
    if days > trends::MAX_WINDOW_DAYS {
        return Err(CommandError::BadRequest(format!(
            "Days must be at most {}",
            trends::MAX_WINDOW_DAYS
        )));
    }

    let today = chrono::Utc::now().date_naive();
    let (start, end) = trends::date_range(today, days)
        .ok_or_else(|| CommandError::BadRequest("Invalid days".to_string()))?;

    let (progress_entries, window) = state.db.with_connection(|conn| {
        let all = queries::get_progress_by_patient_id(conn, patient_id)?;
        let window = queries::get_progress_by_date_range(conn, patient_id, &start, &end)?;
        Ok((all, window))
    })?;

    Ok(ProgressReport {
        progress_entries,
        analytics: trends::compute_patient_analytics(&window, today, days),
    })
}

/// Record a finished exercise for the caller's own patient profile. A linked
/// assignment moves to `in_progress`.
pub fn create_progress(
    state: &AppState,
    caller: Option<&str>,
    new: NewProgressEntry,
) -> Result<ProgressEntry, CommandError> {
    let user_id = require_caller(caller)?;

    let patient = state
        .db
        .with_connection(|conn| queries::get_patient_by_user_id(conn, user_id))?;
    if patient.map(|p| p.id) != Some(new.patient_id.clone()) {
        return Err(CommandError::Forbidden("Invalid patient".to_string()));
    }

    let entry = state.db.with_connection(|conn| {
        let entry = queries::insert_progress(conn, &new, &trends::today())?;
        if let Some(assignment_id) = &new.exercise_assignment_id {
            queries::update_assignment(
                conn,
                assignment_id,
                AssignmentUpdate::status(AssignmentStatus::InProgress),
            )?;
        }
        Ok(entry)
    })?;

    tracing::info!(
        "Recorded {} for patient {} ({}% accuracy)",
        entry.exercise_name,
        entry.patient_id,
        entry.accuracy
    );
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    const THERAPIST_USER: &str = "user_therapist";
    const PATIENT_USER: &str = "user_patient";

    fn state() -> AppState {
        AppState::in_memory(Default::default()).unwrap()
    }

    fn therapist(state: &AppState) -> Therapist {
        create_therapist(
            state,
            Some(THERAPIST_USER),
            NewTherapist {
                first_name: "Dana".to_string(),
                last_name: "Okafor".to_string(),
                license_number: "PT-1001".to_string(),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn patient(state: &AppState) -> Patient {
        create_patient(
            state,
            Some(PATIENT_USER),
            NewPatient {
                first_name: "Sam".to_string(),
                last_name: "Rivera".to_string(),
                injury_type: "Rotator cuff".to_string(),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn progress_for(patient: &Patient, assignment_id: Option<String>) -> NewProgressEntry {
        NewProgressEntry {
            patient_id: patient.id.clone(),
            exercise_assignment_id: assignment_id,
            exercise_name: "Shoulder Press".to_string(),
            duration: 300,
            accuracy: 80.0,
            score: 0.8,
            ..Default::default()
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(3600), "1h 0m 0s");
        assert_eq!(format_duration(3725), "1h 2m 5s");
    }

    #[test]
    fn test_missing_caller_is_unauthorized() {
        let state = state();

        let err = get_exercises(&state, None).unwrap_err();
        assert!(matches!(err, CommandError::Unauthorized));
        assert_eq!(err.status(), 401);

        assert!(matches!(get_patient(&state, Some("")), Err(CommandError::Unauthorized)));
        assert!(matches!(
            get_progress(&state, None, Some("patient_1"), None),
            Err(CommandError::Unauthorized)
        ));
    }

    #[test]
    fn test_get_exercises_returns_catalog() {
        let state = state();
        let exercises = get_exercises(&state, Some(PATIENT_USER)).unwrap();
        assert_eq!(exercises.len(), 3);
    }

    #[test]
    fn test_create_patient_once() {
        let state = state();
        let created = patient(&state);

        let fetched = get_patient(&state, Some(PATIENT_USER)).unwrap().unwrap();
        assert_eq!(fetched.id, created.id);

        let err = create_patient(&state, Some(PATIENT_USER), NewPatient::default()).unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(err.to_string(), "Patient profile already exists");
    }

    #[test]
    fn test_get_patient_without_profile() {
        let state = state();
        assert!(get_patient(&state, Some("user_unknown")).unwrap().is_none());
    }

    #[test]
    fn test_update_patient() {
        let state = state();
        let created = patient(&state);

        let updated = update_patient(
            &state,
            Some(PATIENT_USER),
            &created.id,
            PatientUpdate {
                injury_type: Some("ACL tear".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.injury_type, "ACL tear");
        assert_eq!(updated.first_name, "Sam");

        let err = update_patient(&state, Some(PATIENT_USER), "patient_missing", PatientUpdate::default())
            .unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[test]
    fn test_create_therapist_once() {
        let state = state();
        therapist(&state);

        assert!(get_therapist(&state, Some(THERAPIST_USER)).unwrap().is_some());
        let err = create_therapist(&state, Some(THERAPIST_USER), NewTherapist::default()).unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_assign_patient_requires_own_therapist_id() {
        let state = state();
        let t = therapist(&state);
        let p = patient(&state);

        let err = assign_patient(&state, Some(PATIENT_USER), &t.id, &p.id, None).unwrap_err();
        assert_eq!(err.status(), 403);

        let relation =
            assign_patient(&state, Some(THERAPIST_USER), &t.id, &p.id, Some("Post-op".to_string()))
                .unwrap();
        assert_eq!(relation.patient_id, p.id);

        let patients = get_patients_for_therapist(&state, Some(THERAPIST_USER), &t.id).unwrap();
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].therapist_id.as_deref(), Some(t.id.as_str()));
    }

    #[test]
    fn test_assignments_flow() {
        let state = state();
        let t = therapist(&state);
        let p = patient(&state);

        let new = NewAssignment {
            therapist_id: t.id.clone(),
            patient_id: p.id.clone(),
            exercise_id: "ex2".to_string(),
            target_reps: Some(12),
            ..Default::default()
        };

        let err = create_assignment(&state, Some(PATIENT_USER), new.clone()).unwrap_err();
        assert_eq!(err.status(), 403);

        let created = create_assignment(&state, Some(THERAPIST_USER), new).unwrap();
        assert_eq!(created.assignment.status, AssignmentStatus::Assigned);
        assert_eq!(created.exercise.as_ref().unwrap().name, "Arm Curl");

        let for_patient = get_assignments(&state, Some(PATIENT_USER), Some(&p.id), None).unwrap();
        assert_eq!(for_patient.len(), 1);
        assert!(for_patient[0].exercise.is_some());

        let for_therapist =
            get_assignments(&state, Some(THERAPIST_USER), None, Some(&t.id)).unwrap();
        assert_eq!(for_therapist.len(), 1);

        let err = get_assignments(&state, Some(PATIENT_USER), None, None).unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_update_assignment_missing() {
        let state = state();
        let err = update_assignment(
            &state,
            Some(THERAPIST_USER),
            "assignment_missing",
            AssignmentUpdate::status(AssignmentStatus::Completed),
        )
        .unwrap_err();
        assert_eq!(err.status(), 404);
        assert_eq!(err.to_string(), "Assignment not found");
    }

    #[test]
    fn test_create_progress_requires_own_patient() {
        let state = state();
        let p = patient(&state);

        let err = create_progress(&state, Some(THERAPIST_USER), progress_for(&p, None)).unwrap_err();
        assert_eq!(err.status(), 403);

        let entry = create_progress(&state, Some(PATIENT_USER), progress_for(&p, None)).unwrap();
        assert_eq!(entry.date, trends::today());
    }

    #[test]
    fn test_create_progress_marks_assignment_in_progress() {
        let state = state();
        let t = therapist(&state);
        let p = patient(&state);
        let created = create_assignment(
            &state,
            Some(THERAPIST_USER),
            NewAssignment {
                therapist_id: t.id.clone(),
                patient_id: p.id.clone(),
                exercise_id: "ex1".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        create_progress(
            &state,
            Some(PATIENT_USER),
            progress_for(&p, Some(created.assignment.id.clone())),
        )
        .unwrap();

        let assignments = get_assignments(&state, Some(PATIENT_USER), Some(&p.id), None).unwrap();
        assert_eq!(assignments[0].assignment.status, AssignmentStatus::InProgress);
    }

    #[test]
    fn test_get_progress_report() {
        let state = state();
        let p = patient(&state);
        create_progress(&state, Some(PATIENT_USER), progress_for(&p, None)).unwrap();
        create_progress(&state, Some(PATIENT_USER), progress_for(&p, None)).unwrap();

        let report = get_progress(&state, Some(PATIENT_USER), Some(&p.id), Some(7)).unwrap();
        assert_eq!(report.progress_entries.len(), 2);
        assert_eq!(report.analytics.total_exercises, 2);
        assert_eq!(report.analytics.total_time, 600);
        assert_eq!(report.analytics.average_accuracy, 80.0);
        assert_eq!(report.analytics.exercise_frequency["Shoulder Press"], 2);

        let err = get_progress(&state, Some(PATIENT_USER), None, None).unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(err.to_string(), "Patient ID required");
    }

    #[test]
    fn test_get_progress_rejects_oversized_window() {
        let state = state();
        let p = patient(&state);

        let err = get_progress(&state, Some(PATIENT_USER), Some(&p.id), Some(u32::MAX)).unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(err.to_string(), "Days must be at most 3660");

        let report = get_progress(
            &state,
            Some(PATIENT_USER),
            Some(&p.id),
            Some(trends::MAX_WINDOW_DAYS),
        )
        .unwrap();
        assert_eq!(report.analytics.weekly_progress.len(), 523);
    }

    #[test]
    fn test_storage_failure_is_500() {
        let err = CommandError::from(crate::db::DbError::LockPoisoned);
        assert_eq!(err.status(), 500);
        assert_eq!(serde_json::to_string(&err).unwrap(), "\"Database error: Lock poisoned\"");
    }
}
