//! File-backed tracks
//!
//! Each [`FileTrack`] owns a container reader and a pump task that writes
//! paced samples into a `TrackLocalStaticSample`. The pump is spawned paused
//! and only starts reading once the session connects; closing the track
//! cancels the pump and waits for it to drop the file.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use webrtc::api::media_engine::{MIME_TYPE_H264, MIME_TYPE_OPUS, MIME_TYPE_VP8, MIME_TYPE_VP9};
use webrtc::media::io::h264_reader::H264Reader;
use webrtc::media::io::ivf_reader::IVFReader;
use webrtc::media::io::ogg_reader::OggReader;
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

use super::config::ProviderConfig;
use super::track::{MediaTrack, TrackKind};
use crate::error::{Error, Result};

/// Ogg/Opus pages are paced at a fixed interval
const OGG_PAGE_DURATION: Duration = Duration::from_millis(20);

/// Opus RTP clock rate (granule positions count 48 kHz samples)
const OPUS_CLOCK_RATE: u64 = 48_000;

/// Read buffer for the Annex-B NAL scanner
const H264_READ_BUFFER: usize = 1024 * 1024;

/// Fallback when an IVF timebase is degenerate
const DEFAULT_FRAME_DURATION: Duration = Duration::from_millis(33);

/// Container formats the file provider understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// IVF with VP8 or VP9 frames
    Ivf,
    /// Raw H.264 Annex-B byte stream
    H264,
    /// Ogg with Opus pages
    Ogg,
}

impl ContainerFormat {
    /// Detect from the file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "ivf" => Some(ContainerFormat::Ivf),
            "h264" | "264" => Some(ContainerFormat::H264),
            "ogg" | "opus" => Some(ContainerFormat::Ogg),
            _ => None,
        }
    }

    /// Kind of track this container carries
    pub fn kind(self) -> TrackKind {
        match self {
            ContainerFormat::Ivf | ContainerFormat::H264 => TrackKind::Video,
            ContainerFormat::Ogg => TrackKind::Audio,
        }
    }
}

/// Sequential sample reader over one container file
enum SampleReader {
    Ivf {
        reader: IVFReader<BufReader<File>>,
        frame_duration: Duration,
    },
    H264 {
        reader: H264Reader<BufReader<File>>,
        frame_duration: Duration,
    },
    Ogg {
        reader: OggReader<BufReader<File>>,
        last_granule: u64,
    },
}

impl std::fmt::Debug for SampleReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleReader::Ivf { .. } => f.write_str("SampleReader::Ivf"),
            SampleReader::H264 { .. } => f.write_str("SampleReader::H264"),
            SampleReader::Ogg { .. } => f.write_str("SampleReader::Ogg"),
        }
    }
}

impl SampleReader {
    /// Open and validate the container header; returns the reader and codec MIME type
    fn open(
        path: &Path,
        format: ContainerFormat,
        h264_frame_duration: Duration,
    ) -> std::result::Result<(Self, &'static str), String> {
        let buffered = open_buffered(path)?;

        match format {
            ContainerFormat::Ivf => {
                let (reader, header) = IVFReader::new(buffered).map_err(|e| e.to_string())?;
                let mime = match &header.four_cc {
                    b"VP80" => MIME_TYPE_VP8,
                    b"VP90" => MIME_TYPE_VP9,
                    other => {
                        return Err(format!(
                            "unsupported IVF codec {}",
                            String::from_utf8_lossy(other)
                        ))
                    }
                };

                let frame_duration = if header.timebase_denominator == 0 {
                    DEFAULT_FRAME_DURATION
                } else {
                    let millis = 1000 * u64::from(header.timebase_numerator)
                        / u64::from(header.timebase_denominator);
                    if millis == 0 {
                        DEFAULT_FRAME_DURATION
                    } else {
                        Duration::from_millis(millis)
                    }
                };

                Ok((
                    SampleReader::Ivf {
                        reader,
                        frame_duration,
                    },
                    mime,
                ))
            }
            ContainerFormat::H264 => {
                // Annex-B has no header; probe the first NAL on a throwaway reader
                let mut probe = H264Reader::new(buffered, H264_READ_BUFFER);
                probe.next_nal().map_err(|e| e.to_string())?;

                let reader = H264Reader::new(open_buffered(path)?, H264_READ_BUFFER);
                Ok((
                    SampleReader::H264 {
                        reader,
                        frame_duration: h264_frame_duration,
                    },
                    MIME_TYPE_H264,
                ))
            }
            ContainerFormat::Ogg => {
                let (reader, _header) =
                    OggReader::new(buffered, true).map_err(|e| e.to_string())?;
                Ok((
                    SampleReader::Ogg {
                        reader,
                        last_granule: 0,
                    },
                    MIME_TYPE_OPUS,
                ))
            }
        }
    }

    /// [`open`](Self::open) on the blocking pool
    async fn open_blocking(
        path: PathBuf,
        format: ContainerFormat,
        h264_frame_duration: Duration,
    ) -> std::result::Result<(Self, &'static str), String> {
        tokio::task::spawn_blocking(move || Self::open(&path, format, h264_frame_duration))
            .await
            .map_err(|e| e.to_string())?
    }

    /// Next sample and its duration; `None` at end of media
    fn next_sample(&mut self) -> Option<(Bytes, Duration)> {
        match self {
            SampleReader::Ivf {
                reader,
                frame_duration,
            } => {
                let (frame, _) = reader.parse_next_frame().ok()?;
                Some((frame.freeze(), *frame_duration))
            }
            SampleReader::H264 {
                reader,
                frame_duration,
            } => {
                let nal = reader.next_nal().ok()?;
                Some((nal.data.freeze(), *frame_duration))
            }
            SampleReader::Ogg {
                reader,
                last_granule,
            } => {
                let (page, header) = reader.parse_next_page().ok()?;
                let samples = header.granule_position.saturating_sub(*last_granule);
                *last_granule = header.granule_position;
                Some((
                    page.freeze(),
                    Duration::from_millis(samples * 1000 / OPUS_CLOCK_RATE),
                ))
            }
        }
    }

    /// Wall-clock pacing between samples
    fn pace(&self) -> Duration {
        match self {
            SampleReader::Ivf { frame_duration, .. } | SampleReader::H264 { frame_duration, .. } => {
                *frame_duration
            }
            SampleReader::Ogg { .. } => OGG_PAGE_DURATION,
        }
    }
}

fn open_buffered(path: &Path) -> std::result::Result<BufReader<File>, String> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| format!("{}: {}", path.display(), e))
}

/// Where the pump re-reads from when looping
#[derive(Debug, Clone)]
struct PumpSource {
    path: PathBuf,
    format: ContainerFormat,
    h264_frame_duration: Duration,
    looping: bool,
}

/// Track backed by a container file on disk
pub struct FileTrack {
    kind: TrackKind,
    id: String,
    track: Arc<TrackLocalStaticSample>,
    started: AtomicBool,
    start: Arc<Notify>,
    stop: CancellationToken,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl FileTrack {
    /// Open `path` as `format` and spawn its (paused) pump
    pub async fn open(
        path: &Path,
        format: ContainerFormat,
        config: &ProviderConfig,
    ) -> Result<Self> {
        let (reader, mime) =
            SampleReader::open_blocking(path.to_path_buf(), format, config.h264_frame_duration)
                .await
                .map_err(Error::ResourceUnavailable)?;

        let kind = format.kind();
        let id = kind.as_str().to_string();
        let track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime.to_owned(),
                ..Default::default()
            },
            id.clone(),
            config.stream_id.clone(),
        ));

        let start = Arc::new(Notify::new());
        let stop = CancellationToken::new();
        let source = PumpSource {
            path: path.to_path_buf(),
            format,
            h264_frame_duration: config.h264_frame_duration,
            looping: config.loop_playback,
        };

        let pump = tokio::spawn(pump(
            Arc::clone(&track),
            reader,
            source,
            Arc::clone(&start),
            stop.clone(),
        ));

        tracing::debug!(
            path = %path.display(),
            kind = %kind,
            mime = mime,
            "Track opened"
        );

        Ok(Self {
            kind,
            id,
            track,
            started: AtomicBool::new(false),
            start,
            stop,
            pump: Mutex::new(Some(pump)),
        })
    }
}

#[async_trait]
impl MediaTrack for FileTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn local_track(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        Arc::clone(&self.track) as Arc<dyn TrackLocal + Send + Sync>
    }

    fn start(&self) {
        if !self.started.swap(true, Ordering::AcqRel) {
            self.start.notify_one();
        }
    }

    async fn close(&self) -> Result<()> {
        self.stop.cancel();

        if let Some(handle) = self.pump.lock().await.take() {
            if let Err(e) = handle.await {
                tracing::warn!(kind = %self.kind, error = %e, "Media pump ended abnormally");
            }
        }

        Ok(())
    }
}

impl Drop for FileTrack {
    fn drop(&mut self) {
        // A track dropped without `close` must not leave its pump parked
        self.stop.cancel();
    }
}

async fn pump(
    track: Arc<TrackLocalStaticSample>,
    mut reader: SampleReader,
    source: PumpSource,
    start: Arc<Notify>,
    stop: CancellationToken,
) {
    tokio::select! {
        _ = stop.cancelled() => return,
        _ = start.notified() => {}
    }

    loop {
        let mut ticker = tokio::time::interval(reader.pace());
        let mut written = 0u64;

        loop {
            let (returned, next) = match tokio::task::spawn_blocking(move || {
                let next = reader.next_sample();
                (reader, next)
            })
            .await
            {
                Ok(read) => read,
                Err(e) => {
                    tracing::warn!(path = %source.path.display(), error = %e, "Sample read failed");
                    return;
                }
            };
            reader = returned;

            let Some((data, duration)) = next else {
                break;
            };

            let sample = Sample {
                data,
                duration,
                ..Default::default()
            };
            if let Err(e) = track.write_sample(&sample).await {
                tracing::debug!(path = %source.path.display(), error = %e, "Sample write failed");
                return;
            }
            written += 1;

            tokio::select! {
                _ = stop.cancelled() => return,
                _ = ticker.tick() => {}
            }
        }

        if !source.looping || written == 0 {
            tracing::info!(
                path = %source.path.display(),
                samples = written,
                "Media source exhausted"
            );
            return;
        }

        reader = match SampleReader::open_blocking(
            source.path.clone(),
            source.format,
            source.h264_frame_duration,
        )
        .await
        {
            Ok((reader, _)) => reader,
            Err(e) => {
                tracing::warn!(path = %source.path.display(), error = %e, "Failed to rewind media");
                return;
            }
        };
    }
}
