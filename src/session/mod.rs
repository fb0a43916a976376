//! Streaming sessions
//!
//! A session binds one negotiated peer transport to the tracks opened from
//! a resource snapshot. [`Negotiator`] creates sessions; the registry owns
//! them until their lifecycle watcher observes a terminal state.

pub mod negotiator;
pub mod peer;
pub mod state;

pub use negotiator::{NegotiatedSession, Negotiator, NegotiatorConfig};
pub use peer::{Session, SessionId, SessionInfo};
pub use state::SessionState;
