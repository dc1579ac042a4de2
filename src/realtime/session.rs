//! Connection lifecycle of one realtime session

use std::fmt;

use serde::Serialize;

/// Where the client is in its connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Failed,
}

/// Inputs that move the session between phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    ConnectRequested,
    ChannelOpened,
    ConnectFailed,
    ChannelError,
    ChannelClosed,
    DisconnectRequested,
}

impl SessionPhase {
    /// Next phase for `event`. Events that make no sense in the current
    /// phase leave it unchanged.
    pub fn transition(self, event: SessionEvent) -> SessionPhase {
        use SessionEvent::*;
        use SessionPhase::*;

        match (self, event) {
            (Idle, ConnectRequested) => Connecting,
            (Idle, _) => Idle,

            (Connecting, ChannelOpened) => Connected,
            (Connecting, ConnectFailed | ChannelError) => Failed,
            (Connecting, ChannelClosed | DisconnectRequested) => Disconnected,
            (Connecting, _) => Connecting,

            (Connected, ChannelError) => Failed,
            (Connected, ChannelClosed | DisconnectRequested) => Disconnected,
            (Connected, _) => Connected,

            (Disconnected, ConnectRequested) => Connecting,
            (Disconnected, _) => Disconnected,

            (Failed, ConnectRequested) => Connecting,
            (Failed, DisconnectRequested) => Disconnected,
            (Failed, _) => Failed,
        }
    }

    pub fn is_connected(self) -> bool {
        self == SessionPhase::Connected
    }

    /// Connecting or connected
    pub fn is_active(self) -> bool {
        matches!(self, SessionPhase::Connecting | SessionPhase::Connected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Connecting => "connecting",
            SessionPhase::Connected => "connected",
            SessionPhase::Disconnected => "disconnected",
            SessionPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionEvent::*;
    use SessionPhase::*;

    const EVENTS: [SessionEvent; 6] = [
        ConnectRequested,
        ChannelOpened,
        ConnectFailed,
        ChannelError,
        ChannelClosed,
        DisconnectRequested,
    ];

    fn row(from: SessionPhase) -> Vec<SessionPhase> {
        EVENTS.iter().map(|e| from.transition(*e)).collect()
    }

    #[test]
    fn test_idle_only_leaves_on_connect() {
        assert_eq!(row(Idle), vec![Connecting, Idle, Idle, Idle, Idle, Idle]);
    }

    #[test]
    fn test_connecting_row() {
        assert_eq!(
            row(Connecting),
            vec![Connecting, Connected, Failed, Failed, Disconnected, Disconnected]
        );
    }

    #[test]
    fn test_connected_row() {
        assert_eq!(
            row(Connected),
            vec![Connected, Connected, Connected, Failed, Disconnected, Disconnected]
        );
    }

    #[test]
    fn test_terminal_phases_reconnect() {
        assert_eq!(
            row(Disconnected),
            vec![Connecting, Disconnected, Disconnected, Disconnected, Disconnected, Disconnected]
        );
        assert_eq!(
            row(Failed),
            vec![Connecting, Failed, Failed, Failed, Failed, Disconnected]
        );
    }

    #[test]
    fn test_full_lifecycle() {
        let phase = Idle
            .transition(ConnectRequested)
            .transition(ChannelOpened);
        assert!(phase.is_connected());

        let phase = phase.transition(ChannelError);
        assert_eq!(phase, Failed);
        assert!(!phase.is_active());

        let phase = phase.transition(ConnectRequested);
        assert!(phase.is_active());
        assert!(!phase.is_connected());
    }

    #[test]
    fn test_display() {
        assert_eq!(Connected.to_string(), "connected");
        assert_eq!(serde_json::to_string(&Failed).unwrap(), "\"failed\"");
    }
}
