//! Error types
//!
//! Every failure surfaced by the crate carries an [`ErrorKind`] so callers
//! (the HTTP layer in particular) can branch on it without string matching.

use thiserror::Error;

use crate::registry::RegistryError;
use crate::session::SessionId;
use crate::transport::TransportError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed request fields
    InvalidInput,
    /// The requested thing does not exist (no resource, unknown session)
    NotFound,
    /// The media resource cannot be opened
    ResourceUnavailable,
    /// The transport rejected the offer/answer exchange
    NegotiationFailed,
    /// Invariant violation; never expected under correct operation
    Internal,
}

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum Error {
    /// Request field missing or malformed
    #[error("{0}")]
    InvalidInput(String),

    /// SDP offer missing a body or a type
    #[error("invalid offer: {0}")]
    InvalidOffer(String),

    /// Nothing has been enqueued yet
    #[error("No resource enqueued yet")]
    NoResource,

    /// No live session under this id
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// Track provider could not open the resource
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Offer/answer exchange failed at the transport level
    #[error("negotiation failed: {0}")]
    NegotiationFailed(String),

    /// Session registry invariant violated
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// I/O failure outside of a negotiation (bind, serve)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) | Error::InvalidOffer(_) => ErrorKind::InvalidInput,
            Error::NoResource | Error::SessionNotFound(_) => ErrorKind::NotFound,
            Error::ResourceUnavailable(_) => ErrorKind::ResourceUnavailable,
            Error::NegotiationFailed(_) => ErrorKind::NegotiationFailed,
            Error::Registry(_) | Error::Io(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller caused this error (4xx-equivalent)
    pub fn is_client_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidInput | ErrorKind::NotFound)
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Error::NegotiationFailed(err.to_string())
    }
}
