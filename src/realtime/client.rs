//! Realtime posture-analysis client
//!
//! Owns one session at a time: the channel to the scoring service, the
//! dispatcher task applying inbound messages, the frame timer, the frame
//! source and the speech slot. All shared state sits behind std mutexes that
//! are never held across an await.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::capture::{CaptureError, FrameSource, CAMERA_DENIED};
use super::messages::{MessageTag, OutboundMessage};
use super::session::{SessionEvent, SessionPhase};
use super::speech::SpeechSlot;
use super::state::{reduce, AnalysisState, Effect};
use super::summary::SessionTally;
use super::transport::{ChannelEvent, Connector, TransportError};

pub const CONNECT_FAILED: &str = "Failed to connect to server";
pub const CONNECTION_ERROR: &str = "Connection error. Please try again.";

/// Shortest frame cadence; `tokio::time::interval` rejects a zero period
const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct ClientState {
    phase: SessionPhase,
    session_id: Option<String>,
    outbound: Option<mpsc::UnboundedSender<OutboundMessage>>,
    is_analyzing: bool,
    frames_sent: u64,
    analysis: AnalysisState,
    tally: SessionTally,
}

impl ClientState {
    fn apply(&mut self, event: SessionEvent) {
        let next = self.phase.transition(event);
        if next != self.phase {
            tracing::debug!("Session {} -> {} ({:?})", self.phase, next, event);
        }
        self.phase = next;
        if !next.is_connected() {
            self.outbound = None;
        }
    }

    /// Sender for the open channel, if connected
    fn sender(&self) -> Option<mpsc::UnboundedSender<OutboundMessage>> {
        if self.phase.is_connected() {
            self.outbound.clone()
        } else {
            None
        }
    }
}

#[derive(Debug, Default)]
struct Tasks {
    dispatcher: Option<JoinHandle<()>>,
    analysis: Option<JoinHandle<()>>,
}

/// Point-in-time view of the client
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientSnapshot {
    pub phase: SessionPhase,
    pub is_connected: bool,
    pub session_id: Option<String>,
    pub is_analyzing: bool,
    pub camera_open: bool,
    pub frames_sent: u64,
    pub speaking: Option<String>,
    #[serde(flatten)]
    pub analysis: AnalysisState,
}

pub struct PostureClient {
    connector: Arc<dyn Connector>,
    frames: Arc<Mutex<Box<dyn FrameSource>>>,
    speech: Arc<Mutex<SpeechSlot>>,
    state: Arc<Mutex<ClientState>>,
    tasks: Mutex<Tasks>,
    frame_interval: Duration,
}

impl PostureClient {
    pub fn new(
        connector: Arc<dyn Connector>,
        frames: Box<dyn FrameSource>,
        speech: SpeechSlot,
        frame_interval: Duration,
    ) -> Self {
        Self {
            connector,
            frames: Arc::new(Mutex::new(frames)),
            speech: Arc::new(Mutex::new(speech)),
            state: Arc::new(Mutex::new(ClientState::default())),
            tasks: Mutex::new(Tasks::default()),
            frame_interval: frame_interval.max(MIN_FRAME_INTERVAL),
        }
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Create a session and open its channel. A no-op while already
    /// connecting or connected.
    pub async fn connect(&self) -> Result<(), TransportError> {
        let stale = {
            let mut state = lock(&self.state);
            if state.phase.is_active() {
                tracing::debug!("connect() ignored, session is {}", state.phase);
                return Ok(());
            }
            state.apply(SessionEvent::ConnectRequested);
            // Left over from a channel that failed or was closed by the server
            state.session_id.take()
        };
        if let Some(id) = stale {
            self.end_session(&id).await;
        }

        let session_id = match self.connector.create_session().await {
            Ok(id) => id,
            Err(e) => return Err(self.connect_failed(e)),
        };
        let abandoned = {
            let mut state = lock(&self.state);
            let abandoned = state.phase != SessionPhase::Connecting;
            if !abandoned {
                state.session_id = Some(session_id.clone());
            }
            abandoned
        };
        if abandoned {
            tracing::debug!("Session {} created after connect was abandoned", session_id);
            self.end_session(&session_id).await;
            return Ok(());
        }

        let channel = match self.connector.open_channel(&session_id).await {
            Ok(channel) => channel,
            Err(e) => {
                let orphan = lock(&self.state).session_id.take();
                let e = self.connect_failed(e);
                if let Some(id) = orphan {
                    self.end_session(&id).await;
                }
                return Err(e);
            }
        };

        {
            let mut state = lock(&self.state);
            if state.phase != SessionPhase::Connecting {
                // disconnect() ran while the channel was opening
                tracing::debug!("Discarding channel for {}, session is {}", session_id, state.phase);
                return Ok(());
            }
            state.apply(SessionEvent::ChannelOpened);
            state.outbound = Some(channel.outbound);
            state.analysis.error = None;
            state.frames_sent = 0;
            state.tally = SessionTally::start();
        }

        let dispatcher = tokio::spawn(dispatch(
            channel.events,
            Arc::clone(&self.state),
            Arc::clone(&self.speech),
        ));
        if let Some(previous) = lock(&self.tasks).dispatcher.replace(dispatcher) {
            previous.abort();
        }

        tracing::info!("Connected to session {}", session_id);
        Ok(())
    }

    fn connect_failed(&self, error: TransportError) -> TransportError {
        tracing::error!("Failed to connect: {}", error);
        let mut state = lock(&self.state);
        state.apply(SessionEvent::ConnectFailed);
        state.session_id = None;
        state.analysis.error = Some(CONNECT_FAILED.to_string());
        error
    }

    /// Tear the session down. Safe to call in any phase.
    pub async fn disconnect(&self) {
        self.stop_analysis();
        self.stop_camera();

        if let Some(dispatcher) = lock(&self.tasks).dispatcher.take() {
            dispatcher.abort();
        }

        let session_id = {
            let mut state = lock(&self.state);
            state.apply(SessionEvent::DisconnectRequested);
            state.outbound = None;
            state.session_id.take()
        };

        lock(&self.speech).cancel();

        if let Some(id) = session_id {
            tracing::info!("Disconnected from session {}", id);
            self.end_session(&id).await;
        }
    }

    /// Best-effort `end_session`; failures are only logged
    async fn end_session(&self, session_id: &str) {
        if let Err(e) = self.connector.end_session(session_id).await {
            tracing::debug!("Failed to end session {}: {}", session_id, e);
        }
    }

    // ========================================================================
    // Frames
    // ========================================================================

    pub fn start_camera(&self) -> Result<(), CaptureError> {
        let mut frames = lock(&self.frames);
        if frames.is_open() {
            return Ok(());
        }
        frames.open().map_err(|e| {
            tracing::error!("Failed to open camera: {}", e);
            lock(&self.state).analysis.error = Some(CAMERA_DENIED.to_string());
            e
        })
    }

    pub fn stop_camera(&self) {
        lock(&self.frames).release();
    }

    /// Capture and send one frame if connected. Returns whether a frame went out.
    pub fn analyze_frame(&self) -> bool {
        submit_frame(&self.state, &self.frames)
    }

    /// Start submitting frames at the configured cadence. Calling it again
    /// replaces the running timer.
    pub fn start_analysis(&self) {
        let mut tasks = lock(&self.tasks);
        if let Some(previous) = tasks.analysis.take() {
            tracing::debug!("Replacing running frame timer");
            previous.abort();
        }

        lock(&self.state).is_analyzing = true;

        let state = Arc::clone(&self.state);
        let frames = Arc::clone(&self.frames);
        let period = self.frame_interval;
        tasks.analysis = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                submit_frame(&state, &frames);
            }
        }));
    }

    pub fn stop_analysis(&self) {
        if let Some(timer) = lock(&self.tasks).analysis.take() {
            timer.abort();
        }
        lock(&self.state).is_analyzing = false;
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Ask the service to switch exercises. Does nothing when disconnected.
    pub fn change_exercise(&self, name: &str) -> bool {
        self.send(OutboundMessage::ChangeExercise {
            exercise_name: name.to_string(),
        })
    }

    /// Ask the service for its exercise list. Does nothing when disconnected.
    pub fn request_exercises(&self) -> bool {
        self.send(OutboundMessage::GetExercises {})
    }

    fn send(&self, message: OutboundMessage) -> bool {
        let Some(sender) = lock(&self.state).sender() else {
            tracing::debug!("Not connected, dropping {:?}", message);
            return false;
        };
        sender.send(message).is_ok()
    }

    pub fn speak_feedback(&self, text: &str) {
        lock(&self.speech).say(text);
    }

    pub fn clear_error(&self) {
        lock(&self.state).analysis.error = None;
    }

    // ========================================================================
    // Observation
    // ========================================================================

    pub fn snapshot(&self) -> ClientSnapshot {
        let camera_open = lock(&self.frames).is_open();
        let speaking = lock(&self.speech).current().map(str::to_string);
        let state = lock(&self.state);
        ClientSnapshot {
            phase: state.phase,
            is_connected: state.phase.is_connected(),
            session_id: state.session_id.clone(),
            is_analyzing: state.is_analyzing,
            camera_open,
            frames_sent: state.frames_sent,
            speaking,
            analysis: state.analysis.clone(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        lock(&self.state).phase
    }

    pub fn is_connected(&self) -> bool {
        self.phase().is_connected()
    }

    /// Tally of successful results since the last connect
    pub fn tally(&self) -> SessionTally {
        lock(&self.state).tally.clone()
    }
}

impl Drop for PostureClient {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = tasks.analysis.take() {
            timer.abort();
        }
        if let Some(dispatcher) = tasks.dispatcher.take() {
            dispatcher.abort();
        }
        lock(&self.speech).cancel();
        lock(&self.frames).release();
    }
}

// ============================================================================
// Background work
// ============================================================================

fn submit_frame(state: &Mutex<ClientState>, frames: &Mutex<Box<dyn FrameSource>>) -> bool {
    let Some(sender) = lock(state).sender() else {
        return false;
    };
    let Some(frame) = lock(frames).capture() else {
        tracing::trace!("No frame available, skipping tick");
        return false;
    };

    if sender.send(OutboundMessage::Frame { frame }).is_err() {
        tracing::trace!("Channel closed, frame dropped");
        return false;
    }
    lock(state).frames_sent += 1;
    true
}

/// Apply channel events to the client state until the channel ends
async fn dispatch(
    mut events: mpsc::UnboundedReceiver<ChannelEvent>,
    state: Arc<Mutex<ClientState>>,
    speech: Arc<Mutex<SpeechSlot>>,
) {
    while let Some(event) = events.recv().await {
        match event {
            ChannelEvent::Message(message) => {
                if message.tag() == MessageTag::Unknown {
                    tracing::debug!("Ignoring message with unknown type: {}", message.kind);
                    continue;
                }

                let effects = {
                    let mut guard = lock(&state);
                    let current = std::mem::take(&mut guard.analysis);
                    let (next, effects) = reduce(current, &message);
                    guard.analysis = next;
                    if message.tag() == MessageTag::AnalysisResult && message.is_success() {
                        guard.tally.record(&message.data);
                    }
                    effects
                };

                for effect in effects {
                    match effect {
                        Effect::Speak(text) => lock(&speech).say(&text),
                    }
                }
            }
            ChannelEvent::Error(e) => {
                tracing::error!("Channel error: {}", e);
                let mut guard = lock(&state);
                guard.apply(SessionEvent::ChannelError);
                guard.analysis.error = Some(CONNECTION_ERROR.to_string());
            }
            ChannelEvent::Closed => {
                tracing::info!("Channel closed by server");
                lock(&state).apply(SessionEvent::ChannelClosed);
            }
        }
    }
}
