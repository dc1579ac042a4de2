//! Pose landmark type shared by the realtime client and stored progress

use serde::{Deserialize, Serialize};

/// One normalized body-joint coordinate from the pose-estimation service
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Confidence in [0, 1]
    #[serde(default)]
    pub visibility: f64,
}
