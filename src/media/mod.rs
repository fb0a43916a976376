//! Media resources and tracks
//!
//! This module provides:
//! - The resource descriptor and the registry holding the current one
//! - Track handles and the tagged [`TrackSet`] a provider returns
//! - A file/HTTP backed [`TrackProvider`] for IVF, H.264 and Ogg/Opus media

pub mod config;
pub mod file;
pub mod provider;
pub mod pump;
pub mod resource;
pub mod store;
pub mod track;

pub use config::ProviderConfig;
pub use file::FileTrackProvider;
pub use provider::TrackProvider;
pub use pump::{ContainerFormat, FileTrack};
pub use resource::{MediaResource, ResourceKind};
pub use store::ResourceRegistry;
pub use track::{MediaTrack, TrackHandle, TrackKind, TrackSet};
