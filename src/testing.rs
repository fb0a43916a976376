//! Test doubles for the transport and media seams

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

use crate::error::{Error, Result};
use crate::media::{MediaResource, MediaTrack, TrackKind, TrackProvider, TrackSet};
use crate::session::SessionState;
use crate::transport::{
    PeerTransport, RemoteOffer, SessionDescription, TransportError, TransportFactory,
};

pub(crate) const OFFER_SDP: &str = "v=0\r\no=- 4611731400430051336 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";
pub(crate) const ANSWER_SDP: &str = "v=0\r\no=- 1 1 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";

/// A well-formed remote offer
pub(crate) fn offer() -> RemoteOffer {
    RemoteOffer::new(OFFER_SDP, "offer")
}

/// 32-byte IVF file header with no frames
pub(crate) fn ivf_header(four_cc: &[u8; 4]) -> Vec<u8> {
    let mut header = Vec::with_capacity(32);
    header.extend_from_slice(b"DKIF");
    header.extend_from_slice(&0u16.to_le_bytes()); // version
    header.extend_from_slice(&32u16.to_le_bytes()); // header size
    header.extend_from_slice(four_cc);
    header.extend_from_slice(&640u16.to_le_bytes());
    header.extend_from_slice(&480u16.to_le_bytes());
    header.extend_from_slice(&30u32.to_le_bytes()); // timebase denominator
    header.extend_from_slice(&1u32.to_le_bytes()); // timebase numerator
    header.extend_from_slice(&0u32.to_le_bytes()); // frame count
    header.extend_from_slice(&0u32.to_le_bytes()); // unused
    header
}

/// Lets tests keep a handle on a track they hand to a session
#[async_trait]
impl<T: MediaTrack + ?Sized> MediaTrack for Arc<T> {
    fn kind(&self) -> TrackKind {
        (**self).kind()
    }

    fn id(&self) -> &str {
        (**self).id()
    }

    fn local_track(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        (**self).local_track()
    }

    fn start(&self) {
        (**self).start()
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}

pub(crate) struct MockTrack {
    kind: TrackKind,
    track: Arc<TrackLocalStaticSample>,
    starts: AtomicUsize,
    closes: AtomicUsize,
    fail_close: bool,
    close_delay: Option<Duration>,
}

impl MockTrack {
    pub(crate) fn new(kind: TrackKind) -> Self {
        let mime = match kind {
            TrackKind::Video => MIME_TYPE_VP8,
            TrackKind::Audio => MIME_TYPE_OPUS,
        };
        let track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime.to_owned(),
                ..Default::default()
            },
            kind.as_str().to_owned(),
            "mock".to_owned(),
        ));

        Self {
            kind,
            track,
            starts: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            fail_close: false,
            close_delay: None,
        }
    }

    pub(crate) fn boxed(kind: TrackKind) -> Box<dyn MediaTrack> {
        Box::new(Self::new(kind))
    }

    pub(crate) fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// `close` takes this long to finish
    pub(crate) fn slow_close(mut self, delay: Duration) -> Self {
        self.close_delay = Some(delay);
        self
    }

    pub(crate) fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaTrack for MockTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn id(&self) -> &str {
        self.kind.as_str()
    }

    fn local_track(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        self.track.clone()
    }

    fn start(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.close_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_close {
            return Err(Error::ResourceUnavailable("decoder already gone".into()));
        }
        Ok(())
    }
}

pub(crate) struct MockTransport {
    state: Mutex<SessionState>,
    attached: Mutex<Vec<TrackKind>>,
    local: Mutex<Option<SessionDescription>>,
    closes: AtomicUsize,
    reject_offer: bool,
    answer_delay: Option<Duration>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::Negotiating),
            attached: Mutex::new(Vec::new()),
            local: Mutex::new(None),
            closes: AtomicUsize::new(0),
            reject_offer: false,
            answer_delay: None,
        }
    }

    /// Simulate the peer connection reporting a new state
    pub(crate) fn set_state(&self, state: SessionState) {
        *self.state.lock().unwrap() = state;
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub(crate) fn attached_kinds(&self) -> Vec<TrackKind> {
        self.attached.lock().unwrap().clone()
    }
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn add_track(
        &self,
        track: Arc<dyn TrackLocal + Send + Sync>,
    ) -> std::result::Result<(), TransportError> {
        let kind = match TrackLocal::kind(track.as_ref()) {
            RTPCodecType::Audio => TrackKind::Audio,
            _ => TrackKind::Video,
        };
        self.attached.lock().unwrap().push(kind);
        Ok(())
    }

    async fn set_remote_description(
        &self,
        _description: SessionDescription,
    ) -> std::result::Result<(), TransportError> {
        if self.reject_offer {
            return Err(TransportError::Rejected("no compatible codecs".into()));
        }
        Ok(())
    }

    async fn create_answer(&self) -> std::result::Result<SessionDescription, TransportError> {
        if let Some(delay) = self.answer_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(SessionDescription::answer(ANSWER_SDP))
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> std::result::Result<(), TransportError> {
        *self.local.lock().unwrap() = Some(description);
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().unwrap().clone()
    }

    fn connection_state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    async fn close(&self) -> std::result::Result<(), TransportError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        *state = state.advance(SessionState::Closed);
        Ok(())
    }
}

/// Records every transport it hands out
pub(crate) struct MockTransportFactory {
    transports: Mutex<Vec<Arc<MockTransport>>>,
    reject_offer: bool,
    answer_delay: Option<Duration>,
    fail_create: bool,
}

impl MockTransportFactory {
    pub(crate) fn new() -> Self {
        Self {
            transports: Mutex::new(Vec::new()),
            reject_offer: false,
            answer_delay: None,
            fail_create: false,
        }
    }

    /// Transports fail to apply the remote offer
    pub(crate) fn rejecting_offers(mut self) -> Self {
        self.reject_offer = true;
        self
    }

    /// Transports take this long to create an answer
    pub(crate) fn answer_delay(mut self, delay: Duration) -> Self {
        self.answer_delay = Some(delay);
        self
    }

    /// Transport construction itself fails
    pub(crate) fn failing(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub(crate) fn created(&self) -> usize {
        self.transports.lock().unwrap().len()
    }

    pub(crate) fn last(&self) -> Option<Arc<MockTransport>> {
        self.transports.lock().unwrap().last().cloned()
    }

    pub(crate) fn all(&self) -> Vec<Arc<MockTransport>> {
        self.transports.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransportFactory for MockTransportFactory {
    async fn create(&self) -> std::result::Result<Arc<dyn PeerTransport>, TransportError> {
        if self.fail_create {
            return Err(TransportError::Rejected("ICE agent unavailable".into()));
        }

        let mut transport = MockTransport::new();
        transport.reject_offer = self.reject_offer;
        transport.answer_delay = self.answer_delay;

        let transport = Arc::new(transport);
        self.transports.lock().unwrap().push(Arc::clone(&transport));
        Ok(transport)
    }
}

#[derive(Clone, Copy)]
enum ProviderMode {
    AudioVideo,
    VideoOnly,
    AudioOnly,
    Empty,
    Unavailable,
}

/// Produces mock tracks and remembers what it opened
pub(crate) struct MockProvider {
    mode: ProviderMode,
    opened: Mutex<Vec<String>>,
    tracks: Mutex<Vec<Arc<MockTrack>>>,
}

impl MockProvider {
    fn with_mode(mode: ProviderMode) -> Self {
        Self {
            mode,
            opened: Mutex::new(Vec::new()),
            tracks: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn audio_video() -> Self {
        Self::with_mode(ProviderMode::AudioVideo)
    }

    pub(crate) fn video_only() -> Self {
        Self::with_mode(ProviderMode::VideoOnly)
    }

    pub(crate) fn audio_only() -> Self {
        Self::with_mode(ProviderMode::AudioOnly)
    }

    pub(crate) fn empty() -> Self {
        Self::with_mode(ProviderMode::Empty)
    }

    pub(crate) fn unavailable() -> Self {
        Self::with_mode(ProviderMode::Unavailable)
    }

    /// Identifiers passed to `open`, in call order
    pub(crate) fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    /// Total `close` calls across every track handed out
    pub(crate) fn closed_tracks(&self) -> usize {
        self.tracks
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.close_count())
            .sum()
    }

    fn track(&self, kind: TrackKind) -> Box<dyn MediaTrack> {
        let track = Arc::new(MockTrack::new(kind));
        self.tracks.lock().unwrap().push(Arc::clone(&track));
        Box::new(track)
    }
}

#[async_trait]
impl TrackProvider for MockProvider {
    async fn open(&self, resource: &MediaResource) -> Result<TrackSet> {
        self.opened
            .lock()
            .unwrap()
            .push(resource.identifier().to_string());

        let tracks = match self.mode {
            ProviderMode::AudioVideo => TrackSet::from_parts(
                Some(self.track(TrackKind::Video)),
                Some(self.track(TrackKind::Audio)),
            ),
            ProviderMode::VideoOnly => TrackSet::from_parts(Some(self.track(TrackKind::Video)), None),
            ProviderMode::AudioOnly => TrackSet::from_parts(None, Some(self.track(TrackKind::Audio))),
            ProviderMode::Empty => TrackSet::Empty,
            ProviderMode::Unavailable => {
                return Err(Error::ResourceUnavailable(format!(
                    "{}: no such file",
                    resource.identifier()
                )))
            }
        };

        Ok(tracks)
    }
}
