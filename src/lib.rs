//! Posture Portal backend
//!
//! This library provides the Rust backend for a physical-rehabilitation portal.
//! It handles:
//! - Realtime posture-analysis sessions against an external scoring service
//! - Spoken feedback during exercises
//! - The in-memory portal store (patients, therapists, assignments, progress)
//! - Progress analytics and export

pub mod commands;
pub mod config;
pub mod db;
pub mod export;
pub mod models;
pub mod realtime;
pub mod trends;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use config::{AppConfig, ConfigError};
use db::{Database, DbError};
use models::patient::NewPatient;
use realtime::capture::CaptureError;
use realtime::transport::TransportError;
use realtime::{
    ClientSnapshot, FileFrameSource, LogSynthesizer, PostureClient, ProcessSynthesizer,
    SessionTally, SpeechSlot, SpeechSynthesizer, WsConnector,
};

/// Shared application state, constructed once and passed by reference
pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        Self { db, config }
    }

    /// State backed by a fresh in-memory store
    pub fn in_memory(config: AppConfig) -> Result<Self, DbError> {
        Ok(Self::new(Database::open_in_memory()?, config))
    }
}

/// Error type for portal commands
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Unauthorized - {0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CommandError {
    /// HTTP-style status code
    pub fn status(&self) -> u16 {
        match self {
            CommandError::Unauthorized => 401,
            CommandError::Forbidden(_) => 403,
            CommandError::NotFound(_) => 404,
            CommandError::BadRequest(_) => 400,
            CommandError::Database(_) | CommandError::Internal(_) => 500,
        }
    }
}

// Serialized as the display message
impl serde::Serialize for CommandError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Errors that end `run`
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

// ============================================================================
// Application Setup
// ============================================================================

/// Identity used for the local operator's patient profile
const LOCAL_USER: &str = "local-user";

/// Initialize logging; `RUST_LOG` overrides the `info` default
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second init (e.g. from tests) is harmless
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Run one analysis session until Ctrl-C or until the server ends it, then
/// record the session as progress for the local patient
pub async fn run() -> Result<(), RunError> {
    init_logging();
    tracing::info!("Starting Posture Portal");

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Using default configuration: {}", e);
            let mut config = AppConfig::default();
            config.apply_env(|key| std::env::var(key).ok());
            config
        }
    };
    tracing::info!("Scoring service: {}", config.server_url);

    let state = AppState::in_memory(config)?;
    let patient = commands::create_patient(
        &state,
        Some(LOCAL_USER),
        NewPatient {
            first_name: "Local".to_string(),
            last_name: "Patient".to_string(),
            ..Default::default()
        },
    )?;

    let client = build_client(&state.config)?;
    client.connect().await?;

    match &state.config.exercise {
        Some(exercise) => {
            client.change_exercise(exercise);
        }
        None => {
            client.request_exercises();
        }
    }

    if let Err(e) = client.start_camera() {
        client.disconnect().await;
        return Err(e.into());
    }
    client.start_analysis();

    watch(&client).await;

    let tally = client.tally();
    client.disconnect().await;

    record_session(&state, &patient.id, tally)?;
    Ok(())
}

fn build_client(config: &AppConfig) -> Result<PostureClient, RunError> {
    let connector = Arc::new(WsConnector::new(&config.server_url, config.request_timeout())?);

    let frame_path = config
        .frame_path
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("posture-portal-frame.jpg"));
    tracing::info!("Reading frames from {:?}", frame_path);

    let synth: Box<dyn SpeechSynthesizer> = match &config.speech.program {
        Some(program) => Box::new(ProcessSynthesizer::new(program.clone())),
        None => Box::new(LogSynthesizer),
    };

    Ok(PostureClient::new(
        connector,
        Box::new(FileFrameSource::new(frame_path)),
        SpeechSlot::new(synth, config.speech.clone()),
        config.frame_interval(),
    ))
}

/// Log the analysis once a second until Ctrl-C or the session ends
async fn watch(client: &PostureClient) {
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut last_score = None;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Stopping session");
                break;
            }
            _ = ticker.tick() => {
                let snapshot = client.snapshot();
                if !snapshot.phase.is_active() {
                    tracing::warn!("Session ended: {}", snapshot.phase);
                    break;
                }
                if snapshot.analysis.score != last_score {
                    log_snapshot(&snapshot);
                    last_score = snapshot.analysis.score;
                }
            }
        }
    }
}

fn log_snapshot(snapshot: &ClientSnapshot) {
    let analysis = &snapshot.analysis;
    if let Some(error) = &analysis.error {
        tracing::warn!("{}", error);
    }
    tracing::info!(
        exercise = analysis.current_exercise.as_deref().unwrap_or("-"),
        score = analysis.score.unwrap_or_default(),
        correct = analysis.is_correct.unwrap_or_default(),
        frames = snapshot.frames_sent,
        "{}",
        analysis.feedback_messages.join(" | ")
    );
}

fn record_session(state: &AppState, patient_id: &str, tally: SessionTally) -> Result<(), RunError> {
    let Some(entry) = tally.into_progress(patient_id, None, state.config.exercise.as_deref()) else {
        tracing::info!("No analysis results, nothing to record");
        return Ok(());
    };

    let entry = commands::create_progress(state, Some(LOCAL_USER), entry)?;
    tracing::info!(
        "Session: {} in {}, accuracy {}%",
        entry.exercise_name,
        commands::format_duration(entry.duration as u64),
        entry.accuracy
    );

    if let Some(format) = &state.config.export_format {
        let path = export::export_progress(state, Some(LOCAL_USER), patient_id, format)?;
        tracing::info!("Progress exported to {:?}", path);
    }
    Ok(())
}
