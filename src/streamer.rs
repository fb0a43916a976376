//! Streaming facade
//!
//! [`Streamer`] wires the resource registry, the session registry and the
//! negotiator together. It is the single object the HTTP layer holds.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::media::{MediaResource, ResourceRegistry, TrackProvider};
use crate::registry::{RegistryConfig, SessionRegistry};
use crate::session::{NegotiatedSession, Negotiator, NegotiatorConfig, SessionId, SessionInfo};
use crate::transport::{RemoteOffer, TransportFactory};

/// Process-wide streaming state
pub struct Streamer {
    resources: ResourceRegistry,
    sessions: Arc<SessionRegistry>,
    negotiator: Negotiator,
}

impl Streamer {
    /// Create a streamer with default registry and negotiation settings
    pub fn new(transports: Arc<dyn TransportFactory>, provider: Arc<dyn TrackProvider>) -> Self {
        Self::with_config(
            transports,
            provider,
            RegistryConfig::default(),
            NegotiatorConfig::default(),
        )
    }

    /// Create a streamer with custom settings
    pub fn with_config(
        transports: Arc<dyn TransportFactory>,
        provider: Arc<dyn TrackProvider>,
        registry_config: RegistryConfig,
        negotiator_config: NegotiatorConfig,
    ) -> Self {
        let sessions = Arc::new(SessionRegistry::with_config(registry_config));
        let negotiator = Negotiator::with_config(
            transports,
            provider,
            Arc::clone(&sessions),
            negotiator_config,
        );

        Self {
            resources: ResourceRegistry::new(),
            sessions,
            negotiator,
        }
    }

    /// Get the resource registry
    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    /// Get the session registry
    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Replace the resource offered to new sessions
    pub async fn enqueue(&self, resource: MediaResource) -> Result<Arc<MediaResource>> {
        self.resources.set(resource).await
    }

    /// Negotiate a session against the current resource
    ///
    /// The resource is read once, before anything else; an enqueue racing
    /// with this call affects only later negotiations.
    pub async fn handle_offer(&self, offer: &RemoteOffer) -> Result<NegotiatedSession> {
        let resource = self.resources.get().await?;
        self.negotiator.negotiate(offer, resource).await
    }

    /// Snapshot of every live session
    pub async fn list_sessions(&self) -> Vec<SessionInfo> {
        self.sessions.sessions().await
    }

    /// Force a session closed and clean it up
    pub async fn close_session(&self, id: SessionId) -> Result<()> {
        if self.sessions.close_session(id).await {
            tracing::info!(session_id = id, "Session closed on request");
            Ok(())
        } else {
            Err(Error::SessionNotFound(id))
        }
    }

    /// Force cleanup of every session; new negotiations fail afterwards
    pub async fn shutdown(&self) -> usize {
        self.sessions.drain().await
    }
}
