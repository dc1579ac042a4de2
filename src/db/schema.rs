//! Database schema definitions
//!
//! Contains SQL for creating all tables and seeding the exercise catalog.
//! List-valued columns hold JSON arrays.

use rusqlite::{params, Connection};

use super::DbError;
use crate::models::exercise::default_catalog;

/// SQL schema for all tables
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL,
    date_of_birth TEXT NOT NULL,
    injury_type TEXT NOT NULL,
    injury_date TEXT NOT NULL,
    therapist_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_patients_user ON patients(user_id);

CREATE TABLE IF NOT EXISTS therapists (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL,
    license_number TEXT NOT NULL,
    specialization TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_therapists_user ON therapists(user_id);

CREATE TABLE IF NOT EXISTS exercises (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    instructions TEXT NOT NULL,
    target_body_parts TEXT NOT NULL,
    difficulty TEXT NOT NULL,
    duration INTEGER NOT NULL,
    image_url TEXT,
    video_url TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS exercise_assignments (
    id TEXT PRIMARY KEY,
    therapist_id TEXT NOT NULL,
    patient_id TEXT NOT NULL,
    exercise_id TEXT NOT NULL,
    assigned_date TEXT NOT NULL,
    due_date TEXT,
    target_reps INTEGER,
    target_sets INTEGER,
    target_duration INTEGER,
    notes TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_assignments_patient ON exercise_assignments(patient_id);
CREATE INDEX IF NOT EXISTS idx_assignments_therapist ON exercise_assignments(therapist_id);

CREATE TABLE IF NOT EXISTS progress_entries (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL,
    exercise_assignment_id TEXT,
    date TEXT NOT NULL,
    exercise_name TEXT NOT NULL,
    duration INTEGER NOT NULL,
    accuracy REAL NOT NULL,
    score REAL NOT NULL,
    reps INTEGER,
    sets INTEGER,
    feedback TEXT NOT NULL,
    video_analysis_data TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_progress_patient ON progress_entries(patient_id, date);

CREATE TABLE IF NOT EXISTS therapist_patient_relations (
    id TEXT PRIMARY KEY,
    therapist_id TEXT NOT NULL,
    patient_id TEXT NOT NULL,
    assigned_date TEXT NOT NULL,
    status TEXT NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_relations_therapist ON therapist_patient_relations(therapist_id, status);
CREATE INDEX IF NOT EXISTS idx_relations_patient ON therapist_patient_relations(patient_id, status);
"#;

/// Create all database tables
pub fn create_tables(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Insert the default exercise catalog
pub fn seed_exercises(conn: &Connection) -> Result<(), DbError> {
    for exercise in default_catalog() {
        conn.execute(
            r#"
            INSERT OR IGNORE INTO exercises (
                id, name, description, instructions, target_body_parts,
                difficulty, duration, image_url, video_url, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                exercise.id,
                exercise.name,
                exercise.description,
                serde_json::to_string(&exercise.instructions)?,
                serde_json::to_string(&exercise.target_body_parts)?,
                exercise.difficulty.as_str(),
                exercise.duration,
                exercise.image_url,
                exercise.video_url,
                exercise.created_at,
            ],
        )?;
    }
    Ok(())
}
