//! rtc-stream server binary
//!
//! Run with: cargo run -- [--bind ADDR] [--media-dir DIR] [--resource PATH_OR_URL]
//!
//! ```text
//! curl -X POST localhost:8765/enqueue-resource -d '{"path": "videos/clip.ivf"}' \
//!      -H 'content-type: application/json'
//! ```
//!
//! Then post a browser's SDP offer to `/negotiate-offer` and apply the
//! returned answer.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use rtc_stream::media::FileTrackProvider;
use rtc_stream::transport::WebRtcTransportFactory;
use rtc_stream::{MediaResource, ServerConfig, StreamingServer};

/// WebRTC media streaming server
#[derive(Parser, Debug)]
#[command(name = "rtc-stream", version, about)]
struct Args {
    /// Address to bind the HTTP API to
    #[arg(long, env = "RTC_STREAM_BIND", default_value = "0.0.0.0:8765")]
    bind: SocketAddr,

    /// Directory remote resources are downloaded into
    #[arg(long, env = "RTC_STREAM_MEDIA_DIR", default_value = "./videos")]
    media_dir: PathBuf,

    /// STUN/TURN server URLs (comma separated)
    #[arg(long, env = "RTC_STREAM_ICE_SERVERS", value_delimiter = ',')]
    ice_servers: Vec<String>,

    /// Session state poll interval in milliseconds
    #[arg(long, env = "RTC_STREAM_POLL_INTERVAL_MS", default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Give up on an offer/answer exchange after this many seconds
    #[arg(long, env = "RTC_STREAM_NEGOTIATION_TIMEOUT_SECS")]
    negotiation_timeout_secs: Option<u64>,

    /// Refuse sessions whose resource has no playable track
    #[arg(long, env = "RTC_STREAM_REJECT_EMPTY_MEDIA")]
    reject_empty_media: bool,

    /// Restart media from the beginning when it ends
    #[arg(long = "loop", env = "RTC_STREAM_LOOP")]
    loop_playback: bool,

    /// Resource to enqueue at startup (path or http(s) URL)
    #[arg(long, env = "RTC_STREAM_RESOURCE")]
    resource: Option<String>,

    /// Disable permissive CORS
    #[arg(long)]
    no_cors: bool,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig::with_addr(self.bind)
            .media_dir(&self.media_dir)
            .poll_interval(Duration::from_millis(self.poll_interval_ms))
            .loop_playback(self.loop_playback);

        for url in &self.ice_servers {
            config = config.ice_server(url);
        }
        if let Some(secs) = self.negotiation_timeout_secs {
            config = config.negotiation_timeout(Duration::from_secs(secs));
        }
        if self.reject_empty_media {
            config = config.reject_empty_media();
        }
        if self.no_cors {
            config = config.disable_cors();
        }

        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = args.server_config();

    let transports = Arc::new(WebRtcTransportFactory::new(config.transport.clone())?);
    let provider = Arc::new(FileTrackProvider::with_config(config.provider.clone()));
    let server = StreamingServer::new(config, transports, provider);

    if let Some(resource) = &args.resource {
        server.streamer().enqueue(MediaResource::parse(resource.as_str())).await?;
    }

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
