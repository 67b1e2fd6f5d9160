//! Connection state machine.
//!
//! Transitions form a DAG: `idle → connecting → {connected, error}`,
//! `connected ↔ streaming`, any active state → `closing → closed`. A
//! deliberate close always passes through `closing`; `error` is reachable
//! from every non-terminal state. `closed` and `error` are terminal.

/// Lifecycle state of one streaming connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Streaming,
    Closing,
    Closed,
    Error,
}

impl ConnectionState {
    /// Whether the DAG permits moving to `next` from this state.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        match (self, next) {
            // Terminal states admit nothing.
            (Closed, _) | (Error, _) => false,
            // Error is reachable from every non-terminal state.
            (_, Error) => true,
            (Idle, Connecting) => true,
            (Connecting, Connected) => true,
            (Connected, Streaming) => true,
            (Streaming, Connected) => true,
            // Deliberate close never bypasses Closing.
            (Idle | Connecting | Connected | Streaming, Closing) => true,
            (Closing, Closed) => true,
            _ => false,
        }
    }

    /// Closed or errored; nothing further can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Streaming => "streaming",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
            ConnectionState::Error => "error",
        }
    }
}
