//! HTTP server listener
//!
//! Binds the API router and, on shutdown, drains every live session before
//! returning.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::error::Result;
use crate::media::TrackProvider;
use crate::server::config::ServerConfig;
use crate::server::http;
use crate::streamer::Streamer;
use crate::transport::TransportFactory;

/// Streaming server
pub struct StreamingServer {
    config: ServerConfig,
    streamer: Arc<Streamer>,
}

impl StreamingServer {
    /// Create a new server with the given configuration, transport and provider
    pub fn new(
        config: ServerConfig,
        transports: Arc<dyn TransportFactory>,
        provider: Arc<dyn TrackProvider>,
    ) -> Self {
        let streamer = Streamer::with_config(
            transports,
            provider,
            config.registry.clone(),
            config.negotiator.clone(),
        );

        Self::with_streamer(config, Arc::new(streamer))
    }

    /// Create a server around an existing streamer
    pub fn with_streamer(config: ServerConfig, streamer: Arc<Streamer>) -> Self {
        Self { config, streamer }
    }

    /// Get a reference to the streamer
    pub fn streamer(&self) -> &Arc<Streamer> {
        &self.streamer
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Build the API router
    pub fn router(&self) -> axum::Router {
        http::router(Arc::clone(&self.streamer), self.config.cors_enabled)
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "Streaming server listening");

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        // Sessions are force-closed whether serving ended cleanly or not
        let drained = self.streamer.shutdown().await;
        tracing::info!(sessions = drained, "Streaming server stopped");

        result.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::media::MediaResource;
    use crate::testing::{offer, MockProvider, MockTransportFactory};

    fn server() -> (StreamingServer, Arc<MockProvider>) {
        let provider = Arc::new(MockProvider::audio_video());
        let server = StreamingServer::new(
            ServerConfig::with_addr(SocketAddr::from((Ipv4Addr::LOCALHOST, 0))),
            Arc::new(MockTransportFactory::new()),
            provider.clone(),
        );
        (server, provider)
    }

    #[test]
    fn test_bind_addr() {
        let (server, _) = server();
        assert_eq!(server.bind_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_serve_and_drain_on_shutdown() {
        let (server, provider) = server();
        let server = Arc::new(server);

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let serving = {
            let server = Arc::clone(&server);
            tokio::spawn(async move {
                server
                    .serve(listener, async move {
                        let _ = shutdown_rx.await;
                    })
                    .await
            })
        };

        let client = reqwest::Client::new();
        let health: serde_json::Value = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");

        server
            .streamer()
            .enqueue(MediaResource::local_file("a.mp4"))
            .await
            .unwrap();
        server.streamer().handle_offer(&offer()).await.unwrap();
        assert_eq!(server.streamer().sessions().session_count().await, 1);

        shutdown_tx.send(()).unwrap();
        serving.await.unwrap().unwrap();

        assert_eq!(server.streamer().sessions().session_count().await, 0);
        assert!(server.streamer().sessions().is_closed());
        assert_eq!(provider.closed_tracks(), 2);
    }
}
