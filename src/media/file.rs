//! Disk and HTTP backed track provider
//!
//! A local identifier names a container file, or a stem whose siblings hold
//! the elementary streams (`clip.ivf` + `clip.ogg` for `clip.mp4`). Remote
//! identifiers are downloaded into the media directory once per URL, each
//! into its own file, and then opened the same way.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OnceCell};

use super::config::ProviderConfig;
use super::provider::TrackProvider;
use super::pump::{ContainerFormat, FileTrack};
use super::resource::{MediaResource, ResourceKind};
use super::track::{TrackHandle, TrackKind, TrackSet};
use crate::error::{Error, Result};

/// Sibling extensions probed for each track kind, in preference order
const VIDEO_EXTENSIONS: &[&str] = &["ivf", "h264", "264"];
const AUDIO_EXTENSIONS: &[&str] = &["ogg", "opus"];

/// Track provider reading IVF, H.264 Annex-B and Ogg/Opus files
pub struct FileTrackProvider {
    config: ProviderConfig,
    http: reqwest::Client,

    /// Completed (or in-flight) downloads keyed by full URL
    downloads: Mutex<HashMap<String, Arc<OnceCell<PathBuf>>>>,
}

impl FileTrackProvider {
    /// Create a provider with default configuration
    pub fn new() -> Self {
        Self::with_config(ProviderConfig::default())
    }

    /// Create a provider with custom configuration
    pub fn with_config(config: ProviderConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            downloads: Mutex::new(HashMap::new()),
        }
    }

    /// Get the provider configuration
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Local path for a resource, downloading remote ones first
    async fn resolve(&self, resource: &MediaResource) -> Result<PathBuf> {
        match resource.kind() {
            ResourceKind::LocalFile => Ok(PathBuf::from(resource.identifier())),
            ResourceKind::RemoteStream => self.fetch(resource).await,
        }
    }

    /// Local copy of a remote resource
    ///
    /// Concurrent callers for the same URL share one download. A failed
    /// download is not cached, so the next open retries it.
    async fn fetch(&self, resource: &MediaResource) -> Result<PathBuf> {
        let url = resource.identifier();
        let slot = {
            let mut downloads = self.downloads.lock().await;
            Arc::clone(downloads.entry(url.to_string()).or_default())
        };

        if let Some(path) = slot.get() {
            tracing::debug!(url = url, path = %path.display(), "Using cached download");
            return Ok(path.clone());
        }

        slot.get_or_try_init(|| self.download(resource))
            .await
            .cloned()
    }

    /// Download into a fresh file in the media directory
    async fn download(&self, resource: &MediaResource) -> Result<PathBuf> {
        let url = resource.identifier();

        tokio::fs::create_dir_all(&self.config.media_dir)
            .await
            .map_err(|e| unavailable(resource, e))?;

        let response = self
            .http
            .get(url)
            .timeout(self.config.download_timeout)
            .send()
            .await
            .map_err(|e| unavailable(resource, e))?;

        if !response.status().is_success() {
            return Err(unavailable(
                resource,
                format!("download returned {}", response.status()),
            ));
        }

        let body = response.bytes().await.map_err(|e| unavailable(resource, e))?;
        let bytes = body.len();

        let dir = self.config.media_dir.clone();
        let (prefix, suffix) = download_name(resource);
        let target = tokio::task::spawn_blocking(move || persist(&dir, &prefix, &suffix, &body))
            .await
            .map_err(|e| unavailable(resource, e))?
            .map_err(|e| unavailable(resource, e))?;

        tracing::info!(
            url = url,
            path = %target.display(),
            bytes = bytes,
            "Remote resource downloaded"
        );

        Ok(target)
    }

    async fn open_track(&self, path: &Path, format: ContainerFormat) -> Result<TrackHandle> {
        Ok(Box::new(FileTrack::open(path, format, &self.config).await?))
    }
}

impl Default for FileTrackProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrackProvider for FileTrackProvider {
    async fn open(&self, resource: &MediaResource) -> Result<TrackSet> {
        let path = self.resolve(resource).await?;
        let sources = discover(&path).await;

        if sources.video.is_none() && sources.audio.is_none() {
            return Err(unavailable(resource, "no supported media found"));
        }

        let video = match &sources.video {
            Some((path, format)) => Some(self.open_track(path, *format).await?),
            None => None,
        };

        let audio = match &sources.audio {
            Some((path, format)) => match self.open_track(path, *format).await {
                Ok(track) => Some(track),
                Err(e) => {
                    if let Some(video) = video {
                        if let Err(close_err) = video.close().await {
                            tracing::warn!(
                                resource = %resource,
                                error = %close_err,
                                "Failed to close video track"
                            );
                        }
                    }
                    return Err(e);
                }
            },
            None => None,
        };

        tracing::debug!(
            resource = %resource,
            video = ?sources.video.as_ref().map(|(p, _)| p.display().to_string()),
            audio = ?sources.audio.as_ref().map(|(p, _)| p.display().to_string()),
            "Resource opened"
        );

        Ok(TrackSet::from_parts(video, audio))
    }
}

/// Prefix and suffix for a download's file name; the extension is kept so
/// the container format can still be detected
fn download_name(resource: &MediaResource) -> (String, String) {
    let name = Path::new(resource.file_name().unwrap_or("stream"));
    let stem = name
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("stream");
    let suffix = name
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    (format!("{}-", stem), suffix)
}

/// Write `body` to a new uniquely named file in `dir`
fn persist(dir: &Path, prefix: &str, suffix: &str, body: &[u8]) -> std::io::Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(suffix)
        .tempfile_in(dir)?;
    file.write_all(body)?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    Ok(path)
}

/// Container files found for one resource
#[derive(Debug, Default)]
struct Sources {
    video: Option<(PathBuf, ContainerFormat)>,
    audio: Option<(PathBuf, ContainerFormat)>,
}

/// Find at most one video and one audio file for `path`
///
/// The path itself wins for its own track kind; siblings sharing its stem
/// fill in whatever is still missing.
async fn discover(path: &Path) -> Sources {
    let mut sources = Sources::default();

    if is_file(path).await {
        if let Some(format) = ContainerFormat::from_path(path) {
            let slot = match format.kind() {
                TrackKind::Video => &mut sources.video,
                TrackKind::Audio => &mut sources.audio,
            };
            *slot = Some((path.to_path_buf(), format));
        }
    }

    if sources.video.is_none() {
        sources.video = sibling(path, VIDEO_EXTENSIONS).await;
    }
    if sources.audio.is_none() {
        sources.audio = sibling(path, AUDIO_EXTENSIONS).await;
    }

    sources
}

async fn sibling(path: &Path, extensions: &[&str]) -> Option<(PathBuf, ContainerFormat)> {
    for ext in extensions {
        let candidate = path.with_extension(ext);
        if candidate == path || !is_file(&candidate).await {
            continue;
        }
        if let Some(format) = ContainerFormat::from_path(&candidate) {
            return Some((candidate, format));
        }
    }
    None
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

fn unavailable(resource: &MediaResource, reason: impl std::fmt::Display) -> Error {
    Error::ResourceUnavailable(format!("cannot open {}: {}", resource, reason))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::ivf_header;

    /// SPS-looking NAL behind a 4-byte start code, then a second start code
    const H264_STREAM: &[u8] = &[0, 0, 0, 1, 0x67, 0x42, 0x00, 0x1f, 0, 0, 0, 1, 0x68, 0xce];

    /// Serve fixed bodies on an ephemeral local port; returns the base URL and a hit counter
    async fn serve(routes: Vec<(&'static str, Vec<u8>)>) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut router = axum::Router::new();

        for (path, body) in routes {
            let hits = Arc::clone(&hits);
            router = router.route(
                path,
                axum::routing::get(move || {
                    let hits = Arc::clone(&hits);
                    let body = body.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        body
                    }
                }),
            );
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

        (format!("http://{}", addr), hits)
    }

    #[tokio::test]
    async fn test_discover_siblings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.ivf"), ivf_header(b"VP80")).unwrap();
        std::fs::write(dir.path().join("clip.ogg"), b"placeholder").unwrap();

        let sources = discover(&dir.path().join("clip.mp4")).await;

        assert_eq!(sources.video.unwrap().1, ContainerFormat::Ivf);
        assert_eq!(sources.audio.unwrap().1, ContainerFormat::Ogg);
    }

    #[tokio::test]
    async fn test_discover_prefers_path_itself() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.h264"), H264_STREAM).unwrap();
        std::fs::write(dir.path().join("clip.ivf"), ivf_header(b"VP80")).unwrap();

        let sources = discover(&dir.path().join("clip.h264")).await;

        assert_eq!(sources.video.unwrap().1, ContainerFormat::H264);
        assert!(sources.audio.is_none());
    }

    #[tokio::test]
    async fn test_open_video_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.ivf");
        std::fs::write(&path, ivf_header(b"VP80")).unwrap();

        let provider = FileTrackProvider::new();
        let resource = MediaResource::local_file(path.to_string_lossy());
        let tracks = provider.open(&resource).await.unwrap();

        assert!(tracks.has_video());
        assert!(!tracks.has_audio());
        for track in tracks.into_handles() {
            track.close().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_open_through_sibling() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.h264"), H264_STREAM).unwrap();

        let provider = FileTrackProvider::new();
        let resource = MediaResource::local_file(dir.path().join("a.mp4").to_string_lossy());
        let tracks = provider.open(&resource).await.unwrap();

        assert!(matches!(tracks, TrackSet::Video(_)));
        for track in tracks.into_handles() {
            track.close().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_missing_file_unavailable() {
        let provider = FileTrackProvider::new();
        let resource = MediaResource::local_file("/nonexistent/a.mp4");

        let err = provider.open(&resource).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);
    }

    #[tokio::test]
    async fn test_corrupt_file_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ivf");
        std::fs::write(&path, b"garbage garbage garbage garbage!").unwrap();

        let provider = FileTrackProvider::new();
        let resource = MediaResource::local_file(path.to_string_lossy());

        let err = provider.open(&resource).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);
    }

    #[tokio::test]
    async fn test_audio_failure_closes_video() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.ivf"), ivf_header(b"VP80")).unwrap();
        std::fs::write(dir.path().join("clip.ogg"), b"not an ogg stream").unwrap();

        let provider = FileTrackProvider::new();
        let resource = MediaResource::local_file(dir.path().join("clip.mp4").to_string_lossy());

        let err = provider.open(&resource).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);
    }

    #[test]
    fn test_download_name_keeps_extension() {
        let clip = MediaResource::remote_stream("https://cdn.example.com/v/clip.ivf?sig=1");
        assert_eq!(download_name(&clip), ("clip-".to_string(), ".ivf".to_string()));

        let bare = MediaResource::remote_stream("https://cdn.example.com/");
        assert_eq!(download_name(&bare), ("stream-".to_string(), String::new()));
    }

    #[tokio::test]
    async fn test_remote_same_file_name_different_urls() {
        let (base, hits) = serve(vec![
            ("/x/clip.ivf", ivf_header(b"VP80")),
            ("/y/clip.ivf", ivf_header(b"VP90")),
        ])
        .await;
        let dir = tempfile::tempdir().unwrap();
        let provider =
            FileTrackProvider::with_config(ProviderConfig::default().media_dir(dir.path()));

        let x = MediaResource::remote_stream(format!("{}/x/clip.ivf", base));
        let y = MediaResource::remote_stream(format!("{}/y/clip.ivf", base));

        let x_path = provider.fetch(&x).await.unwrap();
        let y_path = provider.fetch(&y).await.unwrap();

        assert_ne!(x_path, y_path);
        assert_eq!(&std::fs::read(&x_path).unwrap()[8..12], b"VP80");
        assert_eq!(&std::fs::read(&y_path).unwrap()[8..12], b"VP90");

        // Same URL again is served from the earlier download
        assert_eq!(provider.fetch(&x).await.unwrap(), x_path);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        let tracks = provider.open(&y).await.unwrap();
        assert!(tracks.has_video());
        for track in tracks.into_handles() {
            track.close().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_concurrent_opens_share_one_download() {
        let (base, hits) = serve(vec![("/slow/big.ivf", ivf_header(b"VP80"))]).await;
        let dir = tempfile::tempdir().unwrap();
        let provider =
            FileTrackProvider::with_config(ProviderConfig::default().media_dir(dir.path()));
        let resource = MediaResource::remote_stream(format!("{}/slow/big.ivf", base));

        let results =
            futures::future::join_all((0..16).map(|_| provider.open(&resource))).await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        for result in results {
            let tracks = result.unwrap();
            assert!(tracks.has_video());
            for track in tracks.into_handles() {
                track.close().await.unwrap();
            }
        }

        // Only the finished download is left in the media directory
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_failed_download_not_cached() {
        let (base, hits) = serve(vec![("/ok.ivf", ivf_header(b"VP80"))]).await;
        let dir = tempfile::tempdir().unwrap();
        let provider =
            FileTrackProvider::with_config(ProviderConfig::default().media_dir(dir.path()));
        let missing = MediaResource::remote_stream(format!("{}/missing.ivf", base));

        for _ in 0..2 {
            let err = provider.open(&missing).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
