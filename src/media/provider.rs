//! Track provider abstraction

use async_trait::async_trait;

use super::resource::MediaResource;
use super::track::TrackSet;
use crate::error::Result;

/// Turns a resource descriptor into playable tracks
///
/// Implementations fail with [`Error::ResourceUnavailable`] when the resource
/// cannot be opened. An empty [`TrackSet`] is a valid result; whether that
/// is acceptable is the caller's decision.
///
/// [`Error::ResourceUnavailable`]: crate::Error::ResourceUnavailable
#[async_trait]
pub trait TrackProvider: Send + Sync {
    async fn open(&self, resource: &MediaResource) -> Result<TrackSet>;
}
