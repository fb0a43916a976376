//! Track handles
//!
//! A track handle owns whatever decodes/paces one elementary stream and the
//! local WebRTC track it writes into. Handles must be closed explicitly;
//! the session that owns them does so exactly once during cleanup.

use std::sync::Arc;

use async_trait::async_trait;
use webrtc::track::track_local::TrackLocal;

use crate::error::Result;

/// Elementary stream type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Audio => "audio",
            TrackKind::Video => "video",
        }
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A playable track bound to one session
#[async_trait]
pub trait MediaTrack: Send + Sync {
    /// Audio or video
    fn kind(&self) -> TrackKind;

    /// Track id as it appears in the SDP
    fn id(&self) -> &str;

    /// The local track to attach to a peer connection
    fn local_track(&self) -> Arc<dyn TrackLocal + Send + Sync>;

    /// Begin delivering media. Calling it more than once has no effect.
    fn start(&self);

    /// Stop delivery and release the underlying decoder
    async fn close(&self) -> Result<()>;
}

/// Owned, type-erased track handle
pub type TrackHandle = Box<dyn MediaTrack>;

/// Tracks produced by opening a resource
///
/// Video and audio are independently optional; match on the variant rather
/// than probing for presence.
pub enum TrackSet {
    /// Resource opened but contained nothing playable
    Empty,
    /// Video only
    Video(TrackHandle),
    /// Audio only
    Audio(TrackHandle),
    /// Both
    AudioVideo { video: TrackHandle, audio: TrackHandle },
}

impl TrackSet {
    /// Build from independently optional parts
    pub fn from_parts(video: Option<TrackHandle>, audio: Option<TrackHandle>) -> Self {
        match (video, audio) {
            (None, None) => TrackSet::Empty,
            (Some(video), None) => TrackSet::Video(video),
            (None, Some(audio)) => TrackSet::Audio(audio),
            (Some(video), Some(audio)) => TrackSet::AudioVideo { video, audio },
        }
    }

    pub fn has_video(&self) -> bool {
        matches!(self, TrackSet::Video(_) | TrackSet::AudioVideo { .. })
    }

    pub fn has_audio(&self) -> bool {
        matches!(self, TrackSet::Audio(_) | TrackSet::AudioVideo { .. })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, TrackSet::Empty)
    }

    /// Number of tracks
    pub fn len(&self) -> usize {
        match self {
            TrackSet::Empty => 0,
            TrackSet::Video(_) | TrackSet::Audio(_) => 1,
            TrackSet::AudioVideo { .. } => 2,
        }
    }

    /// Handles in attach order (video before audio)
    pub fn into_handles(self) -> Vec<TrackHandle> {
        match self {
            TrackSet::Empty => Vec::new(),
            TrackSet::Video(track) | TrackSet::Audio(track) => vec![track],
            TrackSet::AudioVideo { video, audio } => vec![video, audio],
        }
    }
}

impl std::fmt::Debug for TrackSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackSet")
            .field("video", &self.has_video())
            .field("audio", &self.has_audio())
            .finish()
    }
}
