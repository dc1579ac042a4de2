//! Database query implementations
//!
//! Contains functions for creating, reading and updating portal records.
//! Lists come back in insertion order.

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;

use super::DbError;
use crate::models::assignment::{
    AssignmentStatus, AssignmentUpdate, ExerciseAssignment, NewAssignment,
};
use crate::models::exercise::Exercise;
use crate::models::generate_id;
use crate::models::patient::{NewPatient, Patient, PatientUpdate};
use crate::models::progress::{NewProgressEntry, ProgressEntry};
use crate::models::relation::{RelationStatus, TherapistPatientRelation};
use crate::models::therapist::{NewTherapist, Therapist};

// ============================================================================
// Row helpers
// ============================================================================

fn json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|r| {
        serde_json::from_str(&r)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn parsed_column<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

// ============================================================================
// Patients
// ============================================================================

const PATIENT_COLUMNS: &str = "id, user_id, first_name, last_name, email, date_of_birth, \
     injury_type, injury_date, therapist_id, created_at, updated_at";

fn patient_from_row(row: &Row) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        user_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        date_of_birth: row.get(5)?,
        injury_type: row.get(6)?,
        injury_date: row.get(7)?,
        therapist_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Create a patient profile for an identity-provider user
pub fn insert_patient(
    conn: &Connection,
    user_id: &str,
    new: &NewPatient,
) -> Result<Patient, DbError> {
    let timestamp = now();
    let patient = Patient {
        id: generate_id("patient"),
        user_id: user_id.to_string(),
        first_name: new.first_name.clone(),
        last_name: new.last_name.clone(),
        email: new.email.clone(),
        date_of_birth: new.date_of_birth.clone(),
        injury_type: new.injury_type.clone(),
        injury_date: new.injury_date.clone(),
        therapist_id: None,
        created_at: timestamp.clone(),
        updated_at: timestamp,
    };

    write_patient(conn, &patient)?;
    Ok(patient)
}

fn write_patient(conn: &Connection, patient: &Patient) -> Result<(), DbError> {
    conn.execute(
        r#"
        INSERT INTO patients (
            id, user_id, first_name, last_name, email, date_of_birth,
            injury_type, injury_date, therapist_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(id) DO UPDATE SET
            first_name = excluded.first_name,
            last_name = excluded.last_name,
            email = excluded.email,
            date_of_birth = excluded.date_of_birth,
            injury_type = excluded.injury_type,
            injury_date = excluded.injury_date,
            therapist_id = excluded.therapist_id,
            updated_at = excluded.updated_at
        "#,
        params![
            patient.id,
            patient.user_id,
            patient.first_name,
            patient.last_name,
            patient.email,
            patient.date_of_birth,
            patient.injury_type,
            patient.injury_date,
            patient.therapist_id,
            patient.created_at,
            patient.updated_at,
        ],
    )?;
    Ok(())
}

/// Get a patient by record id
pub fn get_patient(conn: &Connection, id: &str) -> Result<Option<Patient>, DbError> {
    let sql = format!("SELECT {} FROM patients WHERE id = ?1", PATIENT_COLUMNS);
    let patient = conn
        .query_row(&sql, params![id], patient_from_row)
        .optional()?;
    Ok(patient)
}

/// Get the patient profile owned by a user
pub fn get_patient_by_user_id(conn: &Connection, user_id: &str) -> Result<Option<Patient>, DbError> {
    let sql = format!(
        "SELECT {} FROM patients WHERE user_id = ?1 ORDER BY rowid LIMIT 1",
        PATIENT_COLUMNS
    );
    let patient = conn
        .query_row(&sql, params![user_id], patient_from_row)
        .optional()?;
    Ok(patient)
}

/// Patients with an active relation to the therapist
pub fn get_patients_by_therapist_id(
    conn: &Connection,
    therapist_id: &str,
) -> Result<Vec<Patient>, DbError> {
    let sql = format!(
        r#"
        SELECT {} FROM patients
        WHERE id IN (
            SELECT patient_id FROM therapist_patient_relations
            WHERE therapist_id = ?1 AND status = 'active'
        )
        ORDER BY rowid
        "#,
        PATIENT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let patients = stmt
        .query_map(params![therapist_id], patient_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(patients)
}

/// Apply a partial update. Returns None when the patient does not exist.
pub fn update_patient(
    conn: &Connection,
    id: &str,
    update: PatientUpdate,
) -> Result<Option<Patient>, DbError> {
    let Some(mut patient) = get_patient(conn, id)? else {
        return Ok(None);
    };

    update.apply(&mut patient);
    patient.updated_at = now();
    write_patient(conn, &patient)?;

    Ok(Some(patient))
}

// ============================================================================
// Therapists
// ============================================================================

fn therapist_from_row(row: &Row) -> rusqlite::Result<Therapist> {
    Ok(Therapist {
        id: row.get(0)?,
        user_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        license_number: row.get(5)?,
        specialization: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Create a therapist profile for an identity-provider user
pub fn insert_therapist(
    conn: &Connection,
    user_id: &str,
    new: &NewTherapist,
) -> Result<Therapist, DbError> {
    let timestamp = now();
    let therapist = Therapist {
        id: generate_id("therapist"),
        user_id: user_id.to_string(),
        first_name: new.first_name.clone(),
        last_name: new.last_name.clone(),
        email: new.email.clone(),
        license_number: new.license_number.clone(),
        specialization: new.specialization.clone(),
        created_at: timestamp.clone(),
        updated_at: timestamp,
    };

    conn.execute(
        r#"
        INSERT INTO therapists (
            id, user_id, first_name, last_name, email,
            license_number, specialization, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            therapist.id,
            therapist.user_id,
            therapist.first_name,
            therapist.last_name,
            therapist.email,
            therapist.license_number,
            therapist.specialization,
            therapist.created_at,
            therapist.updated_at,
        ],
    )?;

    Ok(therapist)
}

/// Get the therapist profile owned by a user
pub fn get_therapist_by_user_id(
    conn: &Connection,
    user_id: &str,
) -> Result<Option<Therapist>, DbError> {
    let therapist = conn
        .query_row(
            r#"
            SELECT id, user_id, first_name, last_name, email,
                   license_number, specialization, created_at, updated_at
            FROM therapists
            WHERE user_id = ?1
            ORDER BY rowid
            LIMIT 1
            "#,
            params![user_id],
            therapist_from_row,
        )
        .optional()?;
    Ok(therapist)
}

// ============================================================================
// Exercises
// ============================================================================

const EXERCISE_COLUMNS: &str = "id, name, description, instructions, target_body_parts, \
     difficulty, duration, image_url, video_url, created_at";

fn exercise_from_row(row: &Row) -> rusqlite::Result<Exercise> {
    Ok(Exercise {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        instructions: json_column(row, 3)?,
        target_body_parts: json_column(row, 4)?,
        difficulty: parsed_column(row, 5)?,
        duration: row.get(6)?,
        image_url: row.get(7)?,
        video_url: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// All exercises in the catalog
pub fn get_all_exercises(conn: &Connection) -> Result<Vec<Exercise>, DbError> {
    let sql = format!("SELECT {} FROM exercises ORDER BY rowid", EXERCISE_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let exercises = stmt
        .query_map([], exercise_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(exercises)
}

/// Get one exercise
pub fn get_exercise_by_id(conn: &Connection, id: &str) -> Result<Option<Exercise>, DbError> {
    let sql = format!("SELECT {} FROM exercises WHERE id = ?1", EXERCISE_COLUMNS);
    let exercise = conn
        .query_row(&sql, params![id], exercise_from_row)
        .optional()?;
    Ok(exercise)
}

// ============================================================================
// Exercise assignments
// ============================================================================

const ASSIGNMENT_COLUMNS: &str = "id, therapist_id, patient_id, exercise_id, assigned_date, \
     due_date, target_reps, target_sets, target_duration, notes, status, created_at, updated_at";

fn assignment_from_row(row: &Row) -> rusqlite::Result<ExerciseAssignment> {
    Ok(ExerciseAssignment {
        id: row.get(0)?,
        therapist_id: row.get(1)?,
        patient_id: row.get(2)?,
        exercise_id: row.get(3)?,
        assigned_date: row.get(4)?,
        due_date: row.get(5)?,
        target_reps: row.get(6)?,
        target_sets: row.get(7)?,
        target_duration: row.get(8)?,
        notes: row.get(9)?,
        status: parsed_column(row, 10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn write_assignment(conn: &Connection, assignment: &ExerciseAssignment) -> Result<(), DbError> {
    conn.execute(
        r#"
        INSERT INTO exercise_assignments (
            id, therapist_id, patient_id, exercise_id, assigned_date, due_date,
            target_reps, target_sets, target_duration, notes, status,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        ON CONFLICT(id) DO UPDATE SET
            due_date = excluded.due_date,
            target_reps = excluded.target_reps,
            target_sets = excluded.target_sets,
            target_duration = excluded.target_duration,
            notes = excluded.notes,
            status = excluded.status,
            updated_at = excluded.updated_at
        "#,
        params![
            assignment.id,
            assignment.therapist_id,
            assignment.patient_id,
            assignment.exercise_id,
            assignment.assigned_date,
            assignment.due_date,
            assignment.target_reps,
            assignment.target_sets,
            assignment.target_duration,
            assignment.notes,
            assignment.status.as_str(),
            assignment.created_at,
            assignment.updated_at,
        ],
    )?;
    Ok(())
}

/// Create an assignment in the `assigned` state
pub fn insert_assignment(
    conn: &Connection,
    new: &NewAssignment,
) -> Result<ExerciseAssignment, DbError> {
    let timestamp = now();
    let assignment = ExerciseAssignment {
        id: generate_id("assignment"),
        therapist_id: new.therapist_id.clone(),
        patient_id: new.patient_id.clone(),
        exercise_id: new.exercise_id.clone(),
        assigned_date: timestamp.clone(),
        due_date: new.due_date.clone(),
        target_reps: new.target_reps,
        target_sets: new.target_sets,
        target_duration: new.target_duration,
        notes: new.notes.clone(),
        status: AssignmentStatus::Assigned,
        created_at: timestamp.clone(),
        updated_at: timestamp,
    };

    write_assignment(conn, &assignment)?;
    Ok(assignment)
}

/// Get one assignment
pub fn get_assignment(conn: &Connection, id: &str) -> Result<Option<ExerciseAssignment>, DbError> {
    let sql = format!(
        "SELECT {} FROM exercise_assignments WHERE id = ?1",
        ASSIGNMENT_COLUMNS
    );
    let assignment = conn
        .query_row(&sql, params![id], assignment_from_row)
        .optional()?;
    Ok(assignment)
}

fn get_assignments_where(
    conn: &Connection,
    column: &str,
    value: &str,
) -> Result<Vec<ExerciseAssignment>, DbError> {
    let sql = format!(
        "SELECT {} FROM exercise_assignments WHERE {} = ?1 ORDER BY rowid",
        ASSIGNMENT_COLUMNS, column
    );
    let mut stmt = conn.prepare(&sql)?;
    let assignments = stmt
        .query_map(params![value], assignment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(assignments)
}

/// Assignments given to a patient
pub fn get_assignments_by_patient_id(
    conn: &Connection,
    patient_id: &str,
) -> Result<Vec<ExerciseAssignment>, DbError> {
    get_assignments_where(conn, "patient_id", patient_id)
}

/// Assignments handed out by a therapist
pub fn get_assignments_by_therapist_id(
    conn: &Connection,
    therapist_id: &str,
) -> Result<Vec<ExerciseAssignment>, DbError> {
    get_assignments_where(conn, "therapist_id", therapist_id)
}

/// Apply a partial update. Returns None when the assignment does not exist.
pub fn update_assignment(
    conn: &Connection,
    id: &str,
    update: AssignmentUpdate,
) -> Result<Option<ExerciseAssignment>, DbError> {
    let Some(mut assignment) = get_assignment(conn, id)? else {
        return Ok(None);
    };

    update.apply(&mut assignment);
    assignment.updated_at = now();
    write_assignment(conn, &assignment)?;

    Ok(Some(assignment))
}

// ============================================================================
// Progress entries
// ============================================================================

const PROGRESS_COLUMNS: &str = "id, patient_id, exercise_assignment_id, date, exercise_name, \
     duration, accuracy, score, reps, sets, feedback, video_analysis_data, created_at";

fn progress_from_row(row: &Row) -> rusqlite::Result<ProgressEntry> {
    Ok(ProgressEntry {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        exercise_assignment_id: row.get(2)?,
        date: row.get(3)?,
        exercise_name: row.get(4)?,
        duration: row.get(5)?,
        accuracy: row.get(6)?,
        score: row.get(7)?,
        reps: row.get(8)?,
        sets: row.get(9)?,
        feedback: json_column(row, 10)?,
        video_analysis_data: optional_json_column(row, 11)?,
        created_at: row.get(12)?,
    })
}

/// Record a progress entry dated `date` (YYYY-MM-DD)
pub fn insert_progress(
    conn: &Connection,
    new: &NewProgressEntry,
    date: &str,
) -> Result<ProgressEntry, DbError> {
    let entry = ProgressEntry {
        id: generate_id("progress"),
        patient_id: new.patient_id.clone(),
        exercise_assignment_id: new.exercise_assignment_id.clone(),
        date: date.to_string(),
        exercise_name: new.exercise_name.clone(),
        duration: new.duration,
        accuracy: new.accuracy,
        score: new.score,
        reps: new.reps,
        sets: new.sets,
        feedback: new.feedback.clone(),
        video_analysis_data: new.video_analysis_data.clone(),
        created_at: now(),
    };

    let analysis_json = entry
        .video_analysis_data
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        r#"
        INSERT INTO progress_entries (
            id, patient_id, exercise_assignment_id, date, exercise_name,
            duration, accuracy, score, reps, sets, feedback,
            video_analysis_data, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
        params![
            entry.id,
            entry.patient_id,
            entry.exercise_assignment_id,
            entry.date,
            entry.exercise_name,
            entry.duration,
            entry.accuracy,
            entry.score,
            entry.reps,
            entry.sets,
            serde_json::to_string(&entry.feedback)?,
            analysis_json,
            entry.created_at,
        ],
    )?;

    Ok(entry)
}

/// Every entry recorded for a patient
pub fn get_progress_by_patient_id(
    conn: &Connection,
    patient_id: &str,
) -> Result<Vec<ProgressEntry>, DbError> {
    let sql = format!(
        "SELECT {} FROM progress_entries WHERE patient_id = ?1 ORDER BY rowid",
        PROGRESS_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let entries = stmt
        .query_map(params![patient_id], progress_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

/// Entries dated within `[start_date, end_date]`, both inclusive
pub fn get_progress_by_date_range(
    conn: &Connection,
    patient_id: &str,
    start_date: &str,
    end_date: &str,
) -> Result<Vec<ProgressEntry>, DbError> {
    let sql = format!(
        r#"
        SELECT {} FROM progress_entries
        WHERE patient_id = ?1 AND date >= ?2 AND date <= ?3
        ORDER BY rowid
        "#,
        PROGRESS_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let entries = stmt
        .query_map(params![patient_id, start_date, end_date], progress_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

// ============================================================================
// Therapist/patient relations
// ============================================================================

fn relation_from_row(row: &Row) -> rusqlite::Result<TherapistPatientRelation> {
    Ok(TherapistPatientRelation {
        id: row.get(0)?,
        therapist_id: row.get(1)?,
        patient_id: row.get(2)?,
        assigned_date: row.get(3)?,
        status: parsed_column(row, 4)?,
        notes: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Relations recorded for a patient, oldest first
pub fn get_relations_by_patient_id(
    conn: &Connection,
    patient_id: &str,
) -> Result<Vec<TherapistPatientRelation>, DbError> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, therapist_id, patient_id, assigned_date, status, notes, created_at, updated_at
        FROM therapist_patient_relations
        WHERE patient_id = ?1
        ORDER BY rowid
        "#,
    )?;
    let relations = stmt
        .query_map(params![patient_id], relation_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(relations)
}

/// Make the therapist the patient's only active therapist.
///
/// Previous active relations of the patient become inactive, and the
/// patient's `therapist_id` is updated when the patient exists.
pub fn assign_patient_to_therapist(
    conn: &Connection,
    therapist_id: &str,
    patient_id: &str,
    notes: Option<String>,
) -> Result<TherapistPatientRelation, DbError> {
    let timestamp = now();

    conn.execute(
        r#"
        UPDATE therapist_patient_relations
        SET status = ?1, updated_at = ?2
        WHERE patient_id = ?3 AND status = ?4
        "#,
        params![
            RelationStatus::Inactive.as_str(),
            timestamp,
            patient_id,
            RelationStatus::Active.as_str(),
        ],
    )?;

    let relation = TherapistPatientRelation {
        id: generate_id("relation"),
        therapist_id: therapist_id.to_string(),
        patient_id: patient_id.to_string(),
        assigned_date: timestamp.clone(),
        status: RelationStatus::Active,
        notes,
        created_at: timestamp.clone(),
        updated_at: timestamp,
    };

    conn.execute(
        r#"
        INSERT INTO therapist_patient_relations (
            id, therapist_id, patient_id, assigned_date, status, notes, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            relation.id,
            relation.therapist_id,
            relation.patient_id,
            relation.assigned_date,
            relation.status.as_str(),
            relation.notes,
            relation.created_at,
            relation.updated_at,
        ],
    )?;

    update_patient(
        conn,
        patient_id,
        PatientUpdate {
            therapist_id: Some(therapist_id.to_string()),
            ..Default::default()
        },
    )?;

    Ok(relation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;
    use crate::models::progress::VideoAnalysisData;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::create_tables(&conn).unwrap();
        schema::seed_exercises(&conn).unwrap();
        conn
    }

    fn new_patient(first: &str) -> NewPatient {
        NewPatient {
            first_name: first.to_string(),
            last_name: "Doe".to_string(),
            email: format!("{}@example.com", first.to_lowercase()),
            date_of_birth: "1985-06-01".to_string(),
            injury_type: "ACL".to_string(),
            injury_date: "2026-02-01".to_string(),
        }
    }

    fn new_therapist() -> NewTherapist {
        NewTherapist {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: "grace@example.com".to_string(),
            license_number: "PT-1234".to_string(),
            specialization: "Orthopedics".to_string(),
        }
    }

    #[test]
    fn test_insert_and_get_patient() {
        let conn = setup();
        let created = insert_patient(&conn, "user_1", &new_patient("Jane")).unwrap();

        assert!(created.id.starts_with("patient_"));
        assert_eq!(get_patient(&conn, &created.id).unwrap(), Some(created.clone()));
        assert_eq!(get_patient_by_user_id(&conn, "user_1").unwrap(), Some(created));
        assert!(get_patient_by_user_id(&conn, "user_2").unwrap().is_none());
    }

    #[test]
    fn test_update_patient_missing_returns_none() {
        let conn = setup();
        let updated = update_patient(&conn, "patient_missing", PatientUpdate::default()).unwrap();
        assert!(updated.is_none());
    }

    #[test]
    fn test_update_patient_overwrites_fields() {
        let conn = setup();
        let created = insert_patient(&conn, "user_1", &new_patient("Jane")).unwrap();

        let updated = update_patient(
            &conn,
            &created.id,
            PatientUpdate {
                email: Some("new@example.com".to_string()),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();

        assert_eq!(updated.email, "new@example.com");
        assert_eq!(updated.first_name, "Jane");
        assert_eq!(get_patient(&conn, &created.id).unwrap().unwrap().email, "new@example.com");
    }

    #[test]
    fn test_exercise_lookup_decodes_lists() {
        let conn = setup();
        let exercise = get_exercise_by_id(&conn, "ex2").unwrap().unwrap();

        assert_eq!(exercise.name, "Arm Curl");
        assert_eq!(exercise.instructions.len(), 4);
        assert_eq!(exercise.target_body_parts, vec!["arms", "biceps"]);
        assert!(get_exercise_by_id(&conn, "ex99").unwrap().is_none());
    }

    #[test]
    fn test_assignment_lifecycle() {
        let conn = setup();
        let assignment = insert_assignment(
            &conn,
            &NewAssignment {
                therapist_id: "therapist_1".to_string(),
                patient_id: "patient_1".to_string(),
                exercise_id: "ex1".to_string(),
                target_reps: Some(12),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(assignment.status, AssignmentStatus::Assigned);
        assert_eq!(get_assignments_by_patient_id(&conn, "patient_1").unwrap().len(), 1);
        assert_eq!(get_assignments_by_therapist_id(&conn, "therapist_1").unwrap().len(), 1);
        assert!(get_assignments_by_patient_id(&conn, "patient_2").unwrap().is_empty());

        let updated = update_assignment(
            &conn,
            &assignment.id,
            AssignmentUpdate::status(AssignmentStatus::InProgress),
        )
        .unwrap()
        .unwrap();
        assert_eq!(updated.status, AssignmentStatus::InProgress);
        assert_eq!(updated.target_reps, Some(12));
    }

    #[test]
    fn test_progress_date_range_is_inclusive() {
        let conn = setup();
        let entry = NewProgressEntry {
            patient_id: "patient_1".to_string(),
            exercise_name: "Arm Curl".to_string(),
            duration: 120,
            accuracy: 80.0,
            score: 0.8,
            feedback: vec!["Keep elbows in".to_string()],
            video_analysis_data: Some(VideoAnalysisData::default()),
            ..Default::default()
        };

        insert_progress(&conn, &entry, "2026-03-01").unwrap();
        insert_progress(&conn, &entry, "2026-03-05").unwrap();
        insert_progress(&conn, &entry, "2026-03-10").unwrap();

        let in_range = get_progress_by_date_range(&conn, "patient_1", "2026-03-01", "2026-03-05").unwrap();
        assert_eq!(in_range.len(), 2);
        assert_eq!(in_range[0].feedback, vec!["Keep elbows in"]);
        assert_eq!(in_range[0].video_analysis_data, Some(VideoAnalysisData::default()));

        assert_eq!(get_progress_by_patient_id(&conn, "patient_1").unwrap().len(), 3);
    }

    #[test]
    fn test_reassigning_patient_deactivates_previous_relation() {
        let conn = setup();
        let patient = insert_patient(&conn, "user_p", &new_patient("Sam")).unwrap();
        let first = insert_therapist(&conn, "user_t1", &new_therapist()).unwrap();
        let second = insert_therapist(&conn, "user_t2", &new_therapist()).unwrap();

        assign_patient_to_therapist(&conn, &first.id, &patient.id, None).unwrap();
        assign_patient_to_therapist(&conn, &second.id, &patient.id, Some("handover".to_string()))
            .unwrap();

        let relations = get_relations_by_patient_id(&conn, &patient.id).unwrap();
        assert_eq!(relations.len(), 2);
        assert_eq!(relations[0].status, RelationStatus::Inactive);
        assert_eq!(relations[1].status, RelationStatus::Active);
        assert_eq!(relations[1].notes.as_deref(), Some("handover"));

        assert!(get_patients_by_therapist_id(&conn, &first.id).unwrap().is_empty());
        let current = get_patients_by_therapist_id(&conn, &second.id).unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].therapist_id.as_deref(), Some(second.id.as_str()));
    }

    #[test]
    fn test_get_therapist_by_user_id() {
        let conn = setup();
        let therapist = insert_therapist(&conn, "user_t", &new_therapist()).unwrap();

        assert_eq!(get_therapist_by_user_id(&conn, "user_t").unwrap(), Some(therapist));
        assert!(get_therapist_by_user_id(&conn, "nobody").unwrap().is_none());
    }
}
