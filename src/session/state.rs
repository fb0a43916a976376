//! Session state machine
//!
//! Tracks a session from negotiation to termination. States are observed
//! from the transport; this type only decides which observed transitions are
//! legal, so a session never leaves a terminal state.
//!
//! ```text
//! Negotiating ──► Connected ──► { Disconnected, Failed, Closed }
//!      │
//!      └────────► { Failed, Closed }
//! ```

use serde::Serialize;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Offer/answer exchanged or in progress, media not flowing yet
    Negotiating,
    /// Peer connected
    Connected,
    /// Peer lost connectivity
    Disconnected,
    /// Connection failed
    Failed,
    /// Connection closed by either side
    Closed,
}

impl SessionState {
    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Disconnected | SessionState::Failed | SessionState::Closed
        )
    }

    /// Whether `self → next` is a legal transition
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;

        match (self, next) {
            (Negotiating, Connected | Failed | Closed) => true,
            (Connected, Disconnected | Failed | Closed) => true,
            _ => false,
        }
    }

    /// Apply an observed state, ignoring illegal transitions
    pub fn advance(self, next: SessionState) -> SessionState {
        if self.can_transition_to(next) {
            next
        } else {
            self
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Negotiating => "negotiating",
            SessionState::Connected => "connected",
            SessionState::Disconnected => "disconnected",
            SessionState::Failed => "failed",
            SessionState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
