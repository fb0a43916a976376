//! Session registry implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::config::RegistryConfig;
use super::error::RegistryError;
use super::watcher::LifecycleWatcher;
use crate::session::{Session, SessionId, SessionInfo};

/// Central registry for all live sessions
///
/// Thread-safe via `RwLock`. A session is present here exactly while it is
/// live; every removal goes through [`cleanup`](Self::cleanup) or
/// [`drain`](Self::drain), both of which release the session first.
pub struct SessionRegistry {
    /// Map of session ID to session
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,

    /// Set by `drain`; no registrations afterwards
    closed: AtomicBool,

    /// Configuration
    config: RegistryConfig,
}

impl SessionRegistry {
    /// Create a new session registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new session registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Add a live session
    pub async fn register(&self, session: Arc<Session>) -> Result<(), RegistryError> {
        let mut sessions = self.sessions.write().await;

        if self.closed.load(Ordering::Acquire) {
            return Err(RegistryError::ShuttingDown);
        }

        let id = session.id();
        if sessions.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }

        sessions.insert(id, session);

        tracing::info!(
            session_id = id,
            sessions = sessions.len(),
            "Session registered"
        );

        Ok(())
    }

    /// Remove a session without releasing it (no-op if absent)
    pub async fn deregister(&self, id: SessionId) -> Option<Arc<Session>> {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(&id);

        if removed.is_some() {
            tracing::info!(
                session_id = id,
                sessions = sessions.len(),
                "Session deregistered"
            );
        }

        removed
    }

    /// Get a live session by ID
    pub async fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Check if a session is live
    pub async fn contains(&self, id: SessionId) -> bool {
        self.sessions.read().await.contains_key(&id)
    }

    /// Get the number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Snapshot of every live session, ordered by ID
    pub async fn sessions(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self
            .sessions
            .read()
            .await
            .values()
            .map(|session| session.info())
            .collect();
        infos.sort_by_key(|info| info.id);
        infos
    }

    /// Release a session and remove it from the registry
    ///
    /// Safe to call from several places concurrently; release runs once and
    /// every caller deregisters only after it has finished, even if release
    /// reported failures.
    pub async fn cleanup(&self, session: &Session) {
        let released = session.release().await;
        self.deregister(session.id()).await;

        if released {
            tracing::info!(
                session_id = session.id(),
                age_secs = session.age().as_secs(),
                "Session cleaned up"
            );
        }
    }

    /// Close a session on request
    ///
    /// Returns `false` if no live session has this ID.
    pub async fn close_session(&self, id: SessionId) -> bool {
        match self.get(id).await {
            Some(session) => {
                self.cleanup(&session).await;
                true
            }
            None => false,
        }
    }

    /// Release every session and stop accepting new ones
    pub async fn drain(&self) -> usize {
        let drained: Vec<Arc<Session>> = {
            let mut sessions = self.sessions.write().await;
            self.closed.store(true, Ordering::Release);
            sessions.drain().map(|(_, session)| session).collect()
        };

        futures::future::join_all(drained.iter().map(|session| session.release())).await;

        tracing::info!(sessions = drained.len(), "Session registry drained");
        drained.len()
    }

    /// Whether `drain` has run
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Spawn the lifecycle watcher for a registered session
    ///
    /// The task ends when the session reaches a terminal state (after
    /// cleaning it up) or when the session is released by someone else.
    pub fn watch(self: &Arc<Self>, session: Arc<Session>) -> JoinHandle<()> {
        LifecycleWatcher::new(Arc::clone(self), session, self.config.poll_interval).spawn()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
