//! Data models module
//!
//! Contains all record types of the portal:
//! - Patients, therapists and their relations
//! - The exercise catalog and assignments
//! - Progress entries and analytics
//! - Pose landmarks shared with the realtime client

pub mod assignment;
pub mod exercise;
pub mod patient;
pub mod pose;
pub mod progress;
pub mod relation;
pub mod therapist;

use rand::Rng;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Synthetic record id: `{prefix}_{unix_millis}_{9 base-36 chars}`
pub fn generate_id(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();

    format!("{}_{}_{}", prefix, chrono::Utc::now().timestamp_millis(), suffix)
}
