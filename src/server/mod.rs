//! HTTP signalling server
//!
//! Exposes the streamer over a small JSON API and owns the process-level
//! shutdown sequence (stop accepting, then drain sessions).

pub mod config;
pub mod http;
pub mod listener;

pub use config::ServerConfig;
pub use http::{router, ApiError, EnqueueRequest, SESSION_ID_HEADER};
pub use listener::StreamingServer;
