//! Registry configuration

use std::time::Duration;

/// Configuration for [`SessionRegistry`](super::SessionRegistry)
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// How often each lifecycle watcher samples its session's state
    pub poll_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl RegistryConfig {
    /// Set the watcher poll interval (zero is ignored)
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.poll_interval = interval;
        }
        self
    }
}
