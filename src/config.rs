//! Application configuration
//!
//! Settings are read from `{config_dir}/posture-portal/config.json` when the
//! file exists, then environment overrides are applied. Missing fields fall
//! back to defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Text-to-speech settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    /// Preferred voice name, passed to the synthesizer as-is
    pub voice: Option<String>,
    /// External TTS program (e.g. `espeak-ng`); utterances are only logged when unset
    pub program: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            rate: 0.9,
            pitch: 1.0,
            volume: 0.8,
            voice: Some("en-us".to_string()),
            program: None,
        }
    }
}

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// WebSocket base URL of the scoring service
    pub server_url: String,
    /// Milliseconds between frame submissions
    pub frame_interval_ms: u64,
    /// JPEG snapshot kept current by an external camera grabber
    pub frame_path: Option<PathBuf>,
    /// Timeout for the session-creation request; none when unset
    pub request_timeout_secs: Option<u64>,
    /// Exercise selected right after connecting
    pub exercise: Option<String>,
    /// Write the session's progress as `csv` or `json` on exit
    pub export_format: Option<String>,
    pub speech: SpeechConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:8000".to_string(),
            frame_interval_ms: 100,
            frame_path: None,
            request_timeout_secs: None,
            exercise: None,
            export_format: None,
            speech: SpeechConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the default location, falling back to defaults when absent,
    /// then apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a JSON config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Apply `POSTURE_*` overrides from a variable lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("POSTURE_SERVER_URL") {
            self.server_url = url;
        }
        if let Some(path) = lookup("POSTURE_FRAME_PATH") {
            self.frame_path = Some(PathBuf::from(path));
        }
        if let Some(program) = lookup("POSTURE_TTS_PROGRAM") {
            self.speech.program = Some(program);
        }
        if let Some(exercise) = lookup("POSTURE_EXERCISE") {
            self.exercise = Some(exercise);
        }
        if let Some(format) = lookup("POSTURE_EXPORT") {
            self.export_format = Some(format);
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Get the default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("posture-portal").join("config.json"))
}
