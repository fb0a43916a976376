//! Track provider configuration

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for [`FileTrackProvider`](super::FileTrackProvider)
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Directory remote resources are downloaded into
    pub media_dir: PathBuf,

    /// Upper bound on a single remote download
    pub download_timeout: Duration,

    /// Restart from the beginning at end of media
    pub loop_playback: bool,

    /// Sample duration for H.264 Annex-B files (they carry no timing)
    pub h264_frame_duration: Duration,

    /// Media stream id shared by a session's tracks (`a=msid`)
    pub stream_id: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from("./videos"),
            download_timeout: Duration::from_secs(60),
            loop_playback: false,
            h264_frame_duration: Duration::from_millis(33),
            stream_id: "rtc-stream".to_string(),
        }
    }
}

impl ProviderConfig {
    /// Set the download directory
    pub fn media_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.media_dir = dir.into();
        self
    }

    /// Set the remote download timeout
    pub fn download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Loop media when it ends
    pub fn loop_playback(mut self, enabled: bool) -> Self {
        self.loop_playback = enabled;
        self
    }

    /// Set the H.264 frame duration (ignored if zero)
    pub fn h264_frame_duration(mut self, duration: Duration) -> Self {
        if !duration.is_zero() {
            self.h264_frame_duration = duration;
        }
        self
    }
}
