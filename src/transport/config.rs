//! Transport configuration

use std::time::Duration;

/// Configuration for [`WebRtcTransportFactory`](super::WebRtcTransportFactory)
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// STUN/TURN server URLs (empty = host candidates only)
    pub ice_servers: Vec<String>,

    /// How long to wait for ICE gathering before answering anyway
    pub gathering_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: Vec::new(),
            gathering_timeout: Duration::from_secs(5),
        }
    }
}

impl TransportConfig {
    /// Add an ICE server URL
    pub fn ice_server(mut self, url: impl Into<String>) -> Self {
        self.ice_servers.push(url.into());
        self
    }

    /// Set the ICE gathering timeout
    pub fn gathering_timeout(mut self, timeout: Duration) -> Self {
        self.gathering_timeout = timeout;
        self
    }
}
