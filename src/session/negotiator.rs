//! Offer/answer negotiation
//!
//! Turns a remote offer plus a resource snapshot into a registered,
//! watched session. Every failure path releases whatever was created
//! before returning, so a failed negotiation leaves nothing behind.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::peer::{Session, SessionId};
use crate::error::{Error, Result};
use crate::media::{MediaResource, TrackProvider, TrackSet};
use crate::registry::SessionRegistry;
use crate::transport::{PeerTransport, RemoteOffer, SessionDescription, TransportFactory};

/// Negotiation policy
#[derive(Debug, Clone)]
pub struct NegotiatorConfig {
    /// Accept sessions whose resource yielded no tracks (logged as degraded)
    pub allow_empty_tracks: bool,

    /// Bound on the transport offer/answer exchange (None = wait forever)
    pub negotiation_timeout: Option<Duration>,
}

impl Default for NegotiatorConfig {
    fn default() -> Self {
        Self {
            allow_empty_tracks: true,
            negotiation_timeout: None,
        }
    }
}

impl NegotiatorConfig {
    /// Set whether zero-track sessions are accepted
    pub fn allow_empty_tracks(mut self, allow: bool) -> Self {
        self.allow_empty_tracks = allow;
        self
    }

    /// Set the exchange timeout
    pub fn negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.negotiation_timeout = Some(timeout);
        self
    }
}

/// Result of a successful negotiation
#[derive(Debug, Clone)]
pub struct NegotiatedSession {
    pub id: SessionId,
    pub answer: SessionDescription,
}

/// Creates sessions from remote offers
pub struct Negotiator {
    transports: Arc<dyn TransportFactory>,
    provider: Arc<dyn TrackProvider>,
    registry: Arc<SessionRegistry>,
    config: NegotiatorConfig,
    next_session_id: AtomicU64,
}

impl Negotiator {
    /// Create a negotiator with default policy
    pub fn new(
        transports: Arc<dyn TransportFactory>,
        provider: Arc<dyn TrackProvider>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self::with_config(transports, provider, registry, NegotiatorConfig::default())
    }

    /// Create a negotiator with custom policy
    pub fn with_config(
        transports: Arc<dyn TransportFactory>,
        provider: Arc<dyn TrackProvider>,
        registry: Arc<SessionRegistry>,
        config: NegotiatorConfig,
    ) -> Self {
        Self {
            transports,
            provider,
            registry,
            config,
            next_session_id: AtomicU64::new(1),
        }
    }

    /// Get the negotiation policy
    pub fn config(&self) -> &NegotiatorConfig {
        &self.config
    }

    /// Negotiate a new session for `offer` against `resource`
    ///
    /// `resource` is the snapshot used for the whole negotiation; later
    /// changes to the resource registry do not affect it. On success the
    /// session is registered and its lifecycle watcher is running.
    pub async fn negotiate(
        &self,
        offer: &RemoteOffer,
        resource: Arc<MediaResource>,
    ) -> Result<NegotiatedSession> {
        let description = offer.validate()?;

        let transport = self.transports.create().await?;
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let mut pending = Pending::new(session_id, Arc::clone(&transport));

        tracing::debug!(session_id = session_id, resource = %resource, "Negotiating session");

        let tracks = match self.open_tracks(&resource).await {
            Ok(tracks) => tracks,
            Err(e) => {
                pending.discard().await;
                tracing::warn!(
                    session_id = session_id,
                    resource = %resource,
                    error = %e,
                    "Negotiation aborted: resource could not be opened"
                );
                return Err(e);
            }
        };

        let session = Arc::new(Session::new(session_id, resource, transport, tracks));
        pending.bind(Arc::clone(&session));

        let answer = match self.exchange(&session, description).await {
            Ok(answer) => answer,
            Err(e) => {
                pending.discard().await;
                tracing::warn!(session_id = session_id, error = %e, "Negotiation failed");
                return Err(e);
            }
        };

        if let Err(e) = self.registry.register(Arc::clone(&session)).await {
            tracing::error!(session_id = session_id, error = %e, "Session registration failed");
            pending.discard().await;
            return Err(e.into());
        }

        // Registered: the watcher owns cleanup from here on
        pending.disarm();
        self.registry.watch(Arc::clone(&session));

        tracing::info!(
            session_id = session_id,
            resource = %session.resource(),
            video = session.has_video(),
            audio = session.has_audio(),
            "Session negotiated"
        );

        Ok(NegotiatedSession {
            id: session_id,
            answer,
        })
    }

    async fn open_tracks(&self, resource: &MediaResource) -> Result<TrackSet> {
        let tracks = self.provider.open(resource).await?;

        match &tracks {
            TrackSet::AudioVideo { .. } => {}
            TrackSet::Video(_) => tracing::warn!(resource = %resource, "No audio track found"),
            TrackSet::Audio(_) => tracing::warn!(resource = %resource, "No video track found"),
            TrackSet::Empty if self.config.allow_empty_tracks => {
                tracing::warn!(resource = %resource, "No media tracks found, session will be degraded");
            }
            TrackSet::Empty => {
                return Err(Error::ResourceUnavailable(format!(
                    "{} contains no playable tracks",
                    resource
                )));
            }
        }

        Ok(tracks)
    }

    /// Attach tracks, apply the offer and produce the local answer
    async fn exchange(
        &self,
        session: &Session,
        offer: SessionDescription,
    ) -> Result<SessionDescription> {
        let work = async {
            let transport = session.transport();

            {
                let tracks = session.tracks().lock().await;
                for track in tracks.iter() {
                    transport.add_track(track.local_track()).await?;
                    tracing::debug!(session_id = session.id(), kind = %track.kind(), "Track attached");
                }
            }

            transport.set_remote_description(offer).await?;
            let answer = transport.create_answer().await?;
            transport.set_local_description(answer.clone()).await?;

            Ok::<_, Error>(transport.local_description().await.unwrap_or(answer))
        };

        match self.config.negotiation_timeout {
            Some(timeout) => tokio::time::timeout(timeout, work).await.map_err(|_| {
                Error::NegotiationFailed(format!("timed out after {}ms", timeout.as_millis()))
            })?,
            None => work.await,
        }
    }
}

/// Whatever a negotiation has created but not yet registered
///
/// Error paths call [`discard`](Self::discard). If the negotiation future is
/// dropped instead (client went away mid-exchange), `Drop` spawns the same
/// cleanup.
struct Pending {
    session_id: SessionId,
    transport: Option<Arc<dyn PeerTransport>>,
    session: Option<Arc<Session>>,
}

impl Pending {
    fn new(session_id: SessionId, transport: Arc<dyn PeerTransport>) -> Self {
        Self {
            session_id,
            transport: Some(transport),
            session: None,
        }
    }

    /// The session now owns the transport
    fn bind(&mut self, session: Arc<Session>) {
        self.transport = None;
        self.session = Some(session);
    }

    fn disarm(&mut self) {
        self.transport = None;
        self.session = None;
    }

    fn is_armed(&self) -> bool {
        self.transport.is_some() || self.session.is_some()
    }

    async fn discard(&mut self) {
        if let Some(session) = self.session.take() {
            session.release().await;
        }
        if let Some(transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                tracing::warn!(
                    session_id = self.session_id,
                    error = %e,
                    "Failed to close discarded transport"
                );
            }
        }
    }
}

impl Drop for Pending {
    fn drop(&mut self) {
        if !self.is_armed() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };

        tracing::warn!(
            session_id = self.session_id,
            "Negotiation abandoned, releasing its resources"
        );

        let mut abandoned = Pending {
            session_id: self.session_id,
            transport: self.transport.take(),
            session: self.session.take(),
        };
        runtime.spawn(async move { abandoned.discard().await });
    }
}
