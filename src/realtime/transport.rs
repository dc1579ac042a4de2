//! Session transport
//!
//! A session is created over HTTP (`POST /session`), then a WebSocket channel
//! is opened at `/ws/{session_id}`. The channel is split into an outbound
//! queue and a stream of inbound events, pumped by one background task.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use super::messages::{InboundMessage, OutboundMessage};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
}

/// Something that happened on an open channel
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Message(InboundMessage),
    Error(String),
    Closed,
}

/// Both ends of an open channel as seen by the client. Dropping `outbound`
/// closes the channel.
#[derive(Debug)]
pub struct Channel {
    pub outbound: mpsc::UnboundedSender<OutboundMessage>,
    pub events: mpsc::UnboundedReceiver<ChannelEvent>,
}

/// Opens sessions against the scoring service
#[async_trait]
pub trait Connector: Send + Sync {
    /// Request a new session identifier
    async fn create_session(&self) -> Result<String, TransportError>;

    /// Open the full-duplex channel for `session_id`
    async fn open_channel(&self, session_id: &str) -> Result<Channel, TransportError>;

    /// Tell the service the session is over
    async fn end_session(&self, _session_id: &str) -> Result<(), TransportError> {
        Ok(())
    }
}

// ============================================================================
// URL helpers
// ============================================================================

/// HTTP base for a WebSocket base URL (`ws://` -> `http://`, `wss://` -> `https://`)
pub fn http_base(ws_base: &str) -> Result<String, TransportError> {
    let base = ws_base.trim_end_matches('/');
    if let Some(rest) = base.strip_prefix("ws://") {
        Ok(format!("http://{}", rest))
    } else if let Some(rest) = base.strip_prefix("wss://") {
        Ok(format!("https://{}", rest))
    } else if base.starts_with("http://") || base.starts_with("https://") {
        Ok(base.to_string())
    } else {
        Err(TransportError::InvalidUrl(ws_base.to_string()))
    }
}

/// Channel URL for a session
pub fn channel_url(ws_base: &str, session_id: &str) -> String {
    format!(
        "{}/ws/{}",
        ws_base.trim_end_matches('/'),
        urlencoding::encode(session_id)
    )
}

// ============================================================================
// WebSocket connector
// ============================================================================

#[derive(Debug, Deserialize)]
struct SessionCreated {
    session_id: String,
}

/// Connector for the real scoring service
pub struct WsConnector {
    ws_base: String,
    http_base: String,
    http: reqwest::Client,
}

impl WsConnector {
    pub fn new(server_url: &str, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            ws_base: server_url.trim_end_matches('/').to_string(),
            http_base: http_base(server_url)?,
            http: builder.build()?,
        })
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn create_session(&self) -> Result<String, TransportError> {
        let created: SessionCreated = self
            .http
            .post(format!("{}/session", self.http_base))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::info!("Session created: {}", created.session_id);
        Ok(created.session_id)
    }

    async fn open_channel(&self, session_id: &str) -> Result<Channel, TransportError> {
        let url = channel_url(&self.ws_base, session_id);
        let (stream, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
        tracing::info!("Channel open: {}", url);

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(pump(stream, outbound_rx, event_tx));

        Ok(Channel {
            outbound: outbound_tx,
            events: event_rx,
        })
    }

    async fn end_session(&self, session_id: &str) -> Result<(), TransportError> {
        self.http
            .delete(format!(
                "{}/session/{}",
                self.http_base,
                urlencoding::encode(session_id)
            ))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Move messages between the socket and the client's queues until either
/// side goes away
async fn pump<S>(
    stream: S,
    mut outbound: mpsc::UnboundedReceiver<OutboundMessage>,
    events: mpsc::UnboundedSender<ChannelEvent>,
) where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let (mut sink, mut stream) = stream.split();

    loop {
        tokio::select! {
            next = outbound.recv() => match next {
                Some(message) => {
                    let text = match message.to_json() {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!("Failed to encode outbound message: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        let _ = events.send(ChannelEvent::Error(e.to_string()));
                        break;
                    }
                }
                None => {
                    // Client dropped its sender
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => match InboundMessage::parse(&text) {
                    Ok(message) => {
                        if events.send(ChannelEvent::Message(message)).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("Ignoring malformed message: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    let _ = events.send(ChannelEvent::Closed);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = events.send(ChannelEvent::Error(e.to_string()));
                    break;
                }
            },
        }
    }

    tracing::debug!("Channel pump stopped");
}
