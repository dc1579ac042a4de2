//! Realtime posture-analysis session
//!
//! - `transport`: session creation and the WebSocket channel
//! - `capture`: camera frame sources
//! - `messages`: wire format
//! - `state`: observable analysis state and the message reducer
//! - `session`: connection lifecycle
//! - `speech`: spoken feedback
//! - `summary`: per-session tally for progress recording
//! - `client`: ties the above together

pub mod capture;
pub mod client;
pub mod messages;
pub mod session;
pub mod speech;
pub mod state;
pub mod summary;
pub mod transport;

pub use capture::{FileFrameSource, FrameSource};
pub use client::{ClientSnapshot, PostureClient};
pub use session::{SessionEvent, SessionPhase};
pub use speech::{LogSynthesizer, ProcessSynthesizer, SpeechSlot, SpeechSynthesizer};
pub use summary::SessionTally;
pub use transport::{Connector, WsConnector};
