//! One peer's streaming session

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::state::SessionState;
use crate::media::{MediaResource, TrackHandle, TrackSet};
use crate::transport::PeerTransport;

/// Unique session ID
pub type SessionId = u64;

/// A peer connection plus the tracks bound to it at negotiation time
///
/// The transport and the track handles are owned here and released by
/// [`Session::release`], which runs its side effects at most once.
pub struct Session {
    id: SessionId,

    /// Resource snapshot the tracks were opened from
    resource: Arc<MediaResource>,

    transport: Arc<dyn PeerTransport>,

    /// Taken (emptied) on release; the lock also serializes `release`
    tracks: Mutex<Vec<TrackHandle>>,

    has_video: bool,
    has_audio: bool,

    /// Set once media delivery has been started
    media_started: AtomicBool,

    /// Set once a `release` call has finished
    released: AtomicBool,

    /// Stops this session's lifecycle watcher
    cancel: CancellationToken,

    created_at: Instant,
}

impl Session {
    /// Bind a transport and its tracks into a new, unregistered session
    pub fn new(
        id: SessionId,
        resource: Arc<MediaResource>,
        transport: Arc<dyn PeerTransport>,
        tracks: TrackSet,
    ) -> Self {
        let has_video = tracks.has_video();
        let has_audio = tracks.has_audio();

        Self {
            id,
            resource,
            transport,
            tracks: Mutex::new(tracks.into_handles()),
            has_video,
            has_audio,
            media_started: AtomicBool::new(false),
            released: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            created_at: Instant::now(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn resource(&self) -> &Arc<MediaResource> {
        &self.resource
    }

    pub(crate) fn transport(&self) -> &Arc<dyn PeerTransport> {
        &self.transport
    }

    pub(crate) fn tracks(&self) -> &Mutex<Vec<TrackHandle>> {
        &self.tracks
    }

    /// State as currently observed on the transport
    pub fn state(&self) -> SessionState {
        self.transport.connection_state()
    }

    pub fn has_video(&self) -> bool {
        self.has_video
    }

    pub fn has_audio(&self) -> bool {
        self.has_audio
    }

    /// Time since the session was created
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Whether cleanup has already run
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Token cancelled when the session is released
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Start media delivery on every track (first call only)
    pub async fn start_media(&self) {
        if self.media_started.swap(true, Ordering::AcqRel) {
            return;
        }

        let tracks = self.tracks.lock().await;
        for track in tracks.iter() {
            track.start();
        }

        tracing::debug!(
            session_id = self.id,
            tracks = tracks.len(),
            "Media delivery started"
        );
    }

    /// Stop the watcher, close every track and the transport
    ///
    /// Returns `false` if an earlier call already released the session.
    /// Concurrent callers wait for the release in progress, so once any
    /// call returns the session's handles are closed. Sub-step failures are
    /// logged and never abort the remaining steps, so this is safe on a
    /// half-negotiated session too.
    pub async fn release(&self) -> bool {
        // Held for the whole release; serializes concurrent callers
        let mut held = self.tracks.lock().await;
        if self.released.load(Ordering::Acquire) {
            return false;
        }

        self.cancel.cancel();

        let tracks: Vec<TrackHandle> = std::mem::take(&mut *held);
        for track in &tracks {
            if let Err(e) = track.close().await {
                tracing::warn!(
                    session_id = self.id,
                    kind = %track.kind(),
                    error = %e,
                    "Failed to close track"
                );
            }
        }

        if let Err(e) = self.transport.close().await {
            tracing::warn!(session_id = self.id, error = %e, "Failed to close transport");
        }

        self.released.store(true, Ordering::Release);

        tracing::debug!(
            session_id = self.id,
            tracks = tracks.len(),
            "Session resources released"
        );

        true
    }

    /// Serializable snapshot
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            state: self.state(),
            resource: self.resource.identifier().to_string(),
            has_video: self.has_video,
            has_audio: self.has_audio,
            age_secs: self.age().as_secs(),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("resource", &self.resource.identifier())
            .field("state", &self.state())
            .field("released", &self.is_released())
            .finish()
    }
}

/// Point-in-time view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub state: SessionState,
    pub resource: String,
    pub has_video: bool,
    pub has_audio: bool,
    pub age_secs: u64,
}
