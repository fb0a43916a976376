//! Registry error types

use thiserror::Error;

use crate::session::SessionId;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A live session already uses this ID
    #[error("Session already registered: {0}")]
    AlreadyRegistered(SessionId),

    /// The registry was drained and accepts no new sessions
    #[error("Session registry is shutting down")]
    ShuttingDown,
}
