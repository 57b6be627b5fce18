//! Incremental mirror of a remote game/song catalog.
//!
//! [`CatalogSynchronizer`] walks the catalog index, every game detail and,
//! in [`SongResolution::Eager`] mode, every song detail. Each level is checked
//! against the cached snapshot with the [`StalenessPolicy`] so that unchanged
//! resources are never fetched again. The resulting tree is turned into an
//! aria2 input file by the [`ManifestCompiler`].

pub mod cache;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod events;
pub mod manifest;
pub mod models;
pub mod staleness;
pub mod sync;
pub mod test_utils;

pub use cache::{CacheKey, CacheStore};
pub use client::{CatalogSource, ClientConfig, Fetched, HttpCatalogClient, ProxyConfig};
pub use endpoints::{DEFAULT_BASE_URL, Endpoints};
pub use error::CatalogError;
pub use events::{OnSyncEvent, Outcome, Stage, SyncEvent};
pub use manifest::{MANIFEST_FILE, Manifest, ManifestCompiler, ManifestEntry, ManifestOptions};
pub use models::{GameRecord, SongRecord};
pub use staleness::{Freshness, StalenessPolicy};
pub use sync::{CatalogSynchronizer, SongResolution, SyncOptions, SyncReport, SyncSummary};
