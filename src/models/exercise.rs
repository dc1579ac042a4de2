//! Exercise catalog types

use serde::{Deserialize, Serialize};

/// Difficulty tier of an exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            other => Err(format!("Unknown difficulty: {}", other)),
        }
    }
}

/// An exercise a therapist can assign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub description: String,
    pub instructions: Vec<String>,
    pub target_body_parts: Vec<String>,
    pub difficulty: Difficulty,
    /// Minutes
    pub duration: u32,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub created_at: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Exercises every new store starts with
pub fn default_catalog() -> Vec<Exercise> {
    let now = chrono::Utc::now().to_rfc3339();

    vec![
        Exercise {
            id: "ex1".to_string(),
            name: "Shoulder Press".to_string(),
            description: "Overhead shoulder strengthening exercise".to_string(),
            instructions: strings(&[
                "Stand with feet shoulder-width apart",
                "Hold weights at shoulder level",
                "Press weights overhead until arms are fully extended",
                "Lower weights back to starting position",
            ]),
            target_body_parts: strings(&["shoulders", "arms"]),
            difficulty: Difficulty::Beginner,
            duration: 10,
            image_url: Some("/exercises/shoulder-press.png".to_string()),
            video_url: None,
            created_at: now.clone(),
        },
        Exercise {
            id: "ex2".to_string(),
            name: "Arm Curl".to_string(),
            description: "Bicep strengthening exercise".to_string(),
            instructions: strings(&[
                "Stand with feet hip-width apart",
                "Hold weights with arms at your sides",
                "Curl weights toward shoulders",
                "Lower weights slowly back to starting position",
            ]),
            target_body_parts: strings(&["arms", "biceps"]),
            difficulty: Difficulty::Beginner,
            duration: 8,
            image_url: Some("/exercises/arm-curl.png".to_string()),
            video_url: None,
            created_at: now.clone(),
        },
        Exercise {
            id: "ex3".to_string(),
            name: "Knee Raises".to_string(),
            description: "Lower body strengthening and mobility".to_string(),
            instructions: strings(&[
                "Stand with feet hip-width apart",
                "Lift one knee toward chest",
                "Hold for 2 seconds",
                "Lower leg and repeat with other side",
            ]),
            target_body_parts: strings(&["legs", "core"]),
            difficulty: Difficulty::Beginner,
            duration: 5,
            image_url: None,
            video_url: None,
            created_at: now,
        },
    ]
}
