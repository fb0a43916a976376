//! Session registry
//!
//! Owns every live session and the background task that watches it.
//!
//! # Architecture
//!
//! ```text
//!                         Arc<SessionRegistry>
//!                     ┌─────────────────────────┐
//!                     │ sessions: HashMap<Id,   │
//!                     │   Arc<Session>          │
//!                     │ >                       │
//!                     └───────────┬─────────────┘
//!                                 │ watch()
//!         ┌───────────────────────┼───────────────────────┐
//!         ▼                       ▼                       ▼
//!    [Watcher 1]             [Watcher 2]             [Watcher N]
//!    poll state ──► Connected: start_media()
//!               └─► terminal:  cleanup() ──► release + deregister
//! ```
//!
//! Cleanup always goes through [`SessionRegistry::cleanup`], whichever side
//! triggers it (watcher, explicit close, shutdown drain). Session release is
//! idempotent, so racing triggers tear a session down once.

pub mod config;
pub mod error;
pub mod store;
pub mod watcher;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use store::SessionRegistry;
pub use watcher::LifecycleWatcher;
