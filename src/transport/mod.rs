//! Peer transport abstraction
//!
//! The session layer talks to the underlying ICE/DTLS/SRTP stack only
//! through [`PeerTransport`]. [`WebRtcTransportFactory`] is the production
//! implementation on top of the `webrtc` crate.

pub mod config;
pub mod peer_connection;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use webrtc::track::track_local::TrackLocal;

use crate::error::{Error, Result};
use crate::session::SessionState;

pub use config::TransportConfig;
pub use peer_connection::{WebRtcTransport, WebRtcTransportFactory};

/// Transport-level failure
#[derive(Debug, Error)]
pub enum TransportError {
    /// Error from the WebRTC stack
    #[error(transparent)]
    WebRtc(#[from] webrtc::Error),

    /// The transport refused the operation
    #[error("{0}")]
    Rejected(String),
}

/// SDP message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

impl SdpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SdpType::Offer => "offer",
            SdpType::Answer => "answer",
            SdpType::Pranswer => "pranswer",
            SdpType::Rollback => "rollback",
        }
    }
}

impl std::str::FromStr for SdpType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "offer" => Ok(SdpType::Offer),
            "answer" => Ok(SdpType::Answer),
            "pranswer" => Ok(SdpType::Pranswer),
            "rollback" => Ok(SdpType::Rollback),
            other => Err(format!("unknown SDP type '{}'", other)),
        }
    }
}

impl std::fmt::Display for SdpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated SDP body plus its type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    pub sdp: String,
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp: sdp.into(),
            sdp_type: SdpType::Offer,
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp: sdp.into(),
            sdp_type: SdpType::Answer,
        }
    }
}

/// An offer as received from a peer, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOffer {
    #[serde(default)]
    pub sdp: Option<String>,
    #[serde(default, rename = "type")]
    pub sdp_type: Option<String>,
}

impl RemoteOffer {
    pub fn new(sdp: impl Into<String>, sdp_type: impl Into<String>) -> Self {
        Self {
            sdp: Some(sdp.into()),
            sdp_type: Some(sdp_type.into()),
        }
    }

    /// Check that both body and type are present and the type is `offer`
    pub fn validate(&self) -> Result<SessionDescription> {
        let sdp = self
            .sdp
            .as_deref()
            .filter(|sdp| !sdp.trim().is_empty())
            .ok_or_else(|| Error::InvalidOffer("missing 'sdp'".into()))?;

        let sdp_type: SdpType = self
            .sdp_type
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::InvalidOffer("missing 'type'".into()))?
            .parse()
            .map_err(Error::InvalidOffer)?;

        if sdp_type != SdpType::Offer {
            return Err(Error::InvalidOffer(format!(
                "expected type 'offer', got '{}'",
                sdp_type
            )));
        }

        Ok(SessionDescription::offer(sdp))
    }
}

/// One negotiated peer connection
///
/// Exclusively owned by its session. State is observed, never assigned by
/// the session layer.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Attach an outbound media track
    async fn add_track(
        &self,
        track: Arc<dyn TrackLocal + Send + Sync>,
    ) -> std::result::Result<(), TransportError>;

    /// Apply the remote peer's description
    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> std::result::Result<(), TransportError>;

    /// Generate an answer to the applied remote offer
    async fn create_answer(&self) -> std::result::Result<SessionDescription, TransportError>;

    /// Apply our own description
    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> std::result::Result<(), TransportError>;

    /// Current local description, if one has been applied
    async fn local_description(&self) -> Option<SessionDescription>;

    /// Latest observed connection state
    fn connection_state(&self) -> SessionState;

    /// Tear the connection down
    async fn close(&self) -> std::result::Result<(), TransportError>;
}

/// Creates a fresh transport per negotiation
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(&self) -> std::result::Result<Arc<dyn PeerTransport>, TransportError>;
}
