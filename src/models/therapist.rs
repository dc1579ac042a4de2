//! Therapist records

use serde::{Deserialize, Serialize};

/// A therapist profile, owned by one authenticated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Therapist {
    pub id: String,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub license_number: String,
    pub specialization: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields supplied when a therapist profile is created
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTherapist {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub license_number: String,
    pub specialization: String,
}
