//! Patient records

use serde::{Deserialize, Serialize};

/// A patient profile, owned by one authenticated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    /// Identity-provider user id
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: String,
    pub injury_type: String,
    pub injury_date: String,
    pub therapist_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Patient {
    /// Display name used in therapist views
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Fields supplied when a patient profile is created
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: String,
    pub injury_type: String,
    pub injury_date: String,
}

/// Partial update; `None` leaves the stored value untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub date_of_birth: Option<String>,
    pub injury_type: Option<String>,
    pub injury_date: Option<String>,
    pub therapist_id: Option<String>,
}

impl PatientUpdate {
    /// Overwrite the fields that are present
    pub fn apply(self, patient: &mut Patient) {
        if let Some(v) = self.first_name {
            patient.first_name = v;
        }
        if let Some(v) = self.last_name {
            patient.last_name = v;
        }
        if let Some(v) = self.email {
            patient.email = v;
        }
        if let Some(v) = self.date_of_birth {
            patient.date_of_birth = v;
        }
        if let Some(v) = self.injury_type {
            patient.injury_type = v;
        }
        if let Some(v) = self.injury_date {
            patient.injury_date = v;
        }
        if let Some(v) = self.therapist_id {
            patient.therapist_id = Some(v);
        }
    }
}
