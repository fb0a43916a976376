//! Per-session lifecycle watcher
//!
//! Samples the session's observed state on a fixed interval. Media delivery
//! starts on the first `Connected` sample; the first terminal sample hands
//! the session to [`SessionRegistry::cleanup`] and ends the task.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::store::SessionRegistry;
use crate::session::{Session, SessionState};

/// Background task bound to one session
pub struct LifecycleWatcher {
    registry: Arc<SessionRegistry>,
    session: Arc<Session>,
    poll_interval: Duration,
}

impl LifecycleWatcher {
    pub fn new(
        registry: Arc<SessionRegistry>,
        session: Arc<Session>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            registry,
            session,
            poll_interval,
        }
    }

    /// Run the watcher on the current runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Poll until the session terminates or is released elsewhere
    pub async fn run(self) {
        let session_id = self.session.id();
        let cancel = self.session.cancellation();

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last = SessionState::Negotiating;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(session_id = session_id, "Watcher stopped, session released");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let state = self.session.state();
            if state != last {
                tracing::info!(
                    session_id = session_id,
                    from = %last,
                    to = %state,
                    "Session state changed"
                );
                last = state;
            }

            if state == SessionState::Connected {
                self.session.start_media().await;
            }

            if state.is_terminal() {
                self.registry.cleanup(&self.session).await;
                return;
            }
        }
    }
}
