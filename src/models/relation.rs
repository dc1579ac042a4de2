//! Therapist/patient relation types

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationStatus {
    Active,
    Inactive,
    Transferred,
}

impl RelationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationStatus::Active => "active",
            RelationStatus::Inactive => "inactive",
            RelationStatus::Transferred => "transferred",
        }
    }
}

impl std::str::FromStr for RelationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(RelationStatus::Active),
            "inactive" => Ok(RelationStatus::Inactive),
            "transferred" => Ok(RelationStatus::Transferred),
            other => Err(format!("Unknown relation status: {}", other)),
        }
    }
}

/// A patient's link to a therapist. A patient has at most one active relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapistPatientRelation {
    pub id: String,
    pub therapist_id: String,
    pub patient_id: String,
    pub assigned_date: String,
    pub status: RelationStatus,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
