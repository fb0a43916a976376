//! WebRTC media streaming server
//!
//! A single shared media resource (a local file or a remote stream) is offered
//! to any number of peers. Each peer posts an SDP offer, gets its own
//! peer connection with the resource's tracks attached, and receives the media
//! over that independent channel.
//!
//! # Architecture
//!
//! ```text
//!   POST /enqueue-resource            POST /negotiate-offer
//!            │                                 │
//!            ▼                                 ▼
//!   ┌──────────────────┐   snapshot   ┌──────────────┐  open   ┌───────────────┐
//!   │ ResourceRegistry │─────────────►│  Negotiator  │────────►│ TrackProvider │
//!   └──────────────────┘              └──────┬───────┘         └───────────────┘
//!                                            │ register + watch
//!                                            ▼
//!                                  ┌──────────────────┐  poll   ┌──────────────┐
//!                                  │ SessionRegistry  │◄────────│ Lifecycle    │
//!                                  │  id → Session    │ cleanup │ Watcher/task │
//!                                  └──────────────────┘         └──────────────┘
//! ```
//!
//! The transport is reached only through [`transport::PeerTransport`]; the
//! production implementation is backed by the `webrtc` crate.

pub mod error;
pub mod media;
pub mod registry;
pub mod server;
pub mod session;
pub mod streamer;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, ErrorKind, Result};
pub use media::{MediaResource, ResourceKind, ResourceRegistry};
pub use registry::{RegistryConfig, SessionRegistry};
pub use server::{ServerConfig, StreamingServer};
pub use session::{Negotiator, NegotiatorConfig, Session, SessionId, SessionState};
pub use streamer::Streamer;
