//! Current media resource
//!
//! Holds the one resource new sessions are negotiated against. Writers are
//! serialized by the lock; the last completed `set` wins. Readers get an
//! `Arc` snapshot, so replacing the resource never touches sessions that
//! already negotiated against the previous one.

use std::sync::Arc;

use tokio::sync::RwLock;

use super::resource::MediaResource;
use crate::error::{Error, Result};

/// Registry of the currently offered media resource
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    current: RwLock<Option<Arc<MediaResource>>>,
}

impl ResourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current resource
    ///
    /// Only the identifier is checked here; whether it can actually be
    /// opened is discovered at negotiation time.
    pub async fn set(&self, resource: MediaResource) -> Result<Arc<MediaResource>> {
        if resource.identifier().trim().is_empty() {
            return Err(Error::InvalidInput("resource identifier is empty".into()));
        }

        let resource = Arc::new(resource);
        let previous = self.current.write().await.replace(Arc::clone(&resource));

        tracing::info!(
            resource = %resource,
            kind = ?resource.kind(),
            replaced = ?previous.as_deref().map(MediaResource::identifier),
            "Resource enqueued"
        );

        Ok(resource)
    }

    /// Snapshot of the current resource
    pub async fn get(&self) -> Result<Arc<MediaResource>> {
        self.current.read().await.clone().ok_or(Error::NoResource)
    }

    /// Whether anything has been enqueued
    pub async fn is_set(&self) -> bool {
        self.current.read().await.is_some()
    }
}
