//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::media::ProviderConfig;
use crate::registry::RegistryConfig;
use crate::session::NegotiatorConfig;
use crate::transport::TransportConfig;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8765;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Allow cross-origin requests from any origin
    pub cors_enabled: bool,

    /// Session registry settings
    pub registry: RegistryConfig,

    /// Negotiation policy
    pub negotiator: NegotiatorConfig,

    /// Track provider settings
    pub provider: ProviderConfig,

    /// Peer connection settings
    pub transport: TransportConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            cors_enabled: true,
            registry: RegistryConfig::default(),
            negotiator: NegotiatorConfig::default(),
            provider: ProviderConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the directory remote resources are downloaded into
    pub fn media_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.provider = self.provider.media_dir(dir);
        self
    }

    /// Disable permissive CORS
    pub fn disable_cors(mut self) -> Self {
        self.cors_enabled = false;
        self
    }

    /// Set the lifecycle watcher poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.registry = self.registry.poll_interval(interval);
        self
    }

    /// Set the offer/answer exchange timeout
    pub fn negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.negotiator = self.negotiator.negotiation_timeout(timeout);
        self
    }

    /// Reject negotiations whose resource has no playable track
    pub fn reject_empty_media(mut self) -> Self {
        self.negotiator = self.negotiator.allow_empty_tracks(false);
        self
    }

    /// Restart media from the beginning when it ends
    pub fn loop_playback(mut self, enabled: bool) -> Self {
        self.provider = self.provider.loop_playback(enabled);
        self
    }

    /// Add a STUN/TURN server URL
    pub fn ice_server(mut self, url: impl Into<String>) -> Self {
        self.transport = self.transport.ice_server(url);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 8765);
        assert!(config.bind_addr.ip().is_unspecified());
        assert!(config.cors_enabled);
        assert_eq!(config.registry.poll_interval, Duration::from_secs(1));
        assert!(config.negotiator.allow_empty_tracks);
        assert!(config.negotiator.negotiation_timeout.is_none());
        assert_eq!(config.provider.media_dir, PathBuf::from("./videos"));
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 9000);
    }

    #[test]
    fn test_builder_pattern() {
        let config = ServerConfig::default()
            .media_dir("/var/media")
            .disable_cors()
            .poll_interval(Duration::from_millis(500))
            .negotiation_timeout(Duration::from_secs(10))
            .reject_empty_media()
            .loop_playback(true)
            .ice_server("stun:stun.l.google.com:19302");

        assert!(!config.cors_enabled);
        assert_eq!(config.provider.media_dir, PathBuf::from("/var/media"));
        assert!(config.provider.loop_playback);
        assert_eq!(config.registry.poll_interval, Duration::from_millis(500));
        assert_eq!(
            config.negotiator.negotiation_timeout,
            Some(Duration::from_secs(10))
        );
        assert!(!config.negotiator.allow_empty_tracks);
        assert_eq!(config.transport.ice_servers.len(), 1);
    }
}
