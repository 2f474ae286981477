//! Session finite-state machine (FSM) type.
//!
//! Transitions are driven by [`crate::session::Session`]; this module only
//! names the states and which moves between them are legal.
//!
//! ```text
//!  IDLE ──handshake sent──▶ HANDSHAKE_SENT ──first datagram──▶ STREAMING
//!                                 │                                │
//!                                 │ shutdown / fatal               │ shutdown / fatal
//!                                 ▼                                ▼
//!                            TERMINATED ◀──────────────────────────┘
//! ```
//!
//! There is no way back out of `Terminated`; a new session is needed.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Socket bound, nothing sent.
    #[default]
    Idle,
    /// Handshake sent; no datagram seen yet.  The device may never answer,
    /// in which case the session waits here until shut down.
    HandshakeSent,
    /// At least one datagram received.
    Streaming,
    /// Sink closed; the session is finished.
    Terminated,
}

impl SessionState {
    /// Whether `self → next` is a legal move.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, HandshakeSent)
                | (HandshakeSent, Streaming)
                | (Idle, Terminated)
                | (HandshakeSent, Terminated)
                | (Streaming, Terminated)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
