//! `webrtc` crate backed transport

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::track::track_local::TrackLocal;

use super::config::TransportConfig;
use super::{PeerTransport, SdpType, SessionDescription, TransportError, TransportFactory};
use crate::session::SessionState;

/// Builds one `RTCPeerConnection` per negotiation from a shared API object
pub struct WebRtcTransportFactory {
    api: API,
    config: TransportConfig,
}

impl WebRtcTransportFactory {
    /// Register default codecs and interceptors once for all connections
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        Ok(Self { api, config })
    }

    /// Get the transport configuration
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn rtc_configuration(&self) -> RTCConfiguration {
        let ice_servers = if self.config.ice_servers.is_empty() {
            Vec::new()
        } else {
            vec![RTCIceServer {
                urls: self.config.ice_servers.clone(),
                ..Default::default()
            }]
        };

        RTCConfiguration {
            ice_servers,
            ..Default::default()
        }
    }
}

#[async_trait]
impl TransportFactory for WebRtcTransportFactory {
    async fn create(&self) -> Result<Arc<dyn PeerTransport>, TransportError> {
        let pc = self.api.new_peer_connection(self.rtc_configuration()).await?;
        let transport = WebRtcTransport::new(Arc::new(pc), self.config.gathering_timeout);
        Ok(Arc::new(transport))
    }
}

/// A single peer connection
pub struct WebRtcTransport {
    pc: Arc<RTCPeerConnection>,
    state: Arc<watch::Sender<SessionState>>,
    gathering_timeout: Duration,
}

impl WebRtcTransport {
    /// Wrap a peer connection and start mirroring its state
    pub fn new(pc: Arc<RTCPeerConnection>, gathering_timeout: Duration) -> Self {
        let (state, _) = watch::channel(SessionState::Negotiating);
        let state = Arc::new(state);

        let observed = Arc::clone(&state);
        pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            if let Some(next) = map_state(s) {
                observed.send_if_modified(|current| {
                    let advanced = current.advance(next);
                    let changed = advanced != *current;
                    *current = advanced;
                    changed
                });
            }
            tracing::debug!(state = %s, "Peer connection state changed");
            Box::pin(async {})
        }));

        Self {
            pc,
            state,
            gathering_timeout,
        }
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

#[async_trait]
impl PeerTransport for WebRtcTransport {
    async fn add_track(&self, track: Arc<dyn TrackLocal + Send + Sync>) -> Result<(), TransportError> {
        let sender = self.pc.add_track(track).await?;

        // RTCP must be drained for interceptors (NACK, reports) to run
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while sender.read(&mut buf).await.is_ok() {}
        });

        Ok(())
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), TransportError> {
        self.pc
            .set_remote_description(to_rtc_description(description)?)
            .await?;
        Ok(())
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        let answer = self.pc.create_answer(None).await?;
        from_rtc_description(&answer)
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), TransportError> {
        let mut gathering_complete = self.pc.gathering_complete_promise().await;
        self.pc
            .set_local_description(to_rtc_description(description)?)
            .await?;

        // Non-trickle: hand out an answer that already carries candidates
        if tokio::time::timeout(self.gathering_timeout, gathering_complete.recv())
            .await
            .is_err()
        {
            tracing::warn!(
                timeout_ms = self.gathering_timeout.as_millis() as u64,
                "ICE gathering incomplete, answering with partial candidates"
            );
        }

        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        let description = self.pc.local_description().await?;
        from_rtc_description(&description).ok()
    }

    fn connection_state(&self) -> SessionState {
        *self.state.borrow()
    }

    async fn close(&self) -> Result<(), TransportError> {
        let result = self.pc.close().await;
        self.state.send_if_modified(|current| {
            let advanced = current.advance(SessionState::Closed);
            let changed = advanced != *current;
            *current = advanced;
            changed
        });
        result.map_err(TransportError::from)
    }
}

/// `None` for states that carry no lifecycle information
fn map_state(state: RTCPeerConnectionState) -> Option<SessionState> {
    match state {
        RTCPeerConnectionState::New | RTCPeerConnectionState::Connecting => {
            Some(SessionState::Negotiating)
        }
        RTCPeerConnectionState::Connected => Some(SessionState::Connected),
        RTCPeerConnectionState::Disconnected => Some(SessionState::Disconnected),
        RTCPeerConnectionState::Failed => Some(SessionState::Failed),
        RTCPeerConnectionState::Closed => Some(SessionState::Closed),
        _ => None,
    }
}

fn to_rtc_description(
    description: SessionDescription,
) -> Result<RTCSessionDescription, TransportError> {
    let rtc = match description.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(description.sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(description.sdp)?,
        SdpType::Pranswer => RTCSessionDescription::pranswer(description.sdp)?,
        SdpType::Rollback => {
            return Err(TransportError::Rejected(
                "rollback descriptions are not supported".into(),
            ))
        }
    };
    Ok(rtc)
}

fn from_rtc_description(
    description: &RTCSessionDescription,
) -> Result<SessionDescription, TransportError> {
    let sdp_type = match description.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        _ => {
            return Err(TransportError::Rejected(
                "description has no SDP type".into(),
            ))
        }
    };

    Ok(SessionDescription {
        sdp: description.sdp.clone(),
        sdp_type,
    })
}
