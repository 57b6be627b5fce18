//! On-disk JSON snapshots of catalog resources.
//!
//! Every resource has one deterministic location under the cache root:
//!
//! - `{root}/index.json` for the catalog index
//! - `{root}/{game_id}/data.json` for a game detail
//! - `{root}/{game_id}/{song_id}/data.json` for a song detail
//!
//! Snapshots are the verbatim response bodies. Writes go through a temp file
//! in the target directory followed by a rename, so a concurrent reader sees
//! either the previous snapshot or the new one, never a partial file.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{CatalogError, Result};

const INDEX_FILE: &str = "index.json";
const DATA_FILE: &str = "data.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Catalog,
    Game(u64),
    Song { game_id: u64, song_id: u64 },
}

impl CacheKey {
    pub fn relative_path(&self) -> PathBuf {
        match self {
            CacheKey::Catalog => PathBuf::from(INDEX_FILE),
            CacheKey::Game(game_id) => PathBuf::from(game_id.to_string()).join(DATA_FILE),
            CacheKey::Song { game_id, song_id } => PathBuf::from(game_id.to_string())
                .join(song_id.to_string())
                .join(DATA_FILE),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Catalog => write!(f, "catalog index"),
            CacheKey::Game(game_id) => write!(f, "game {game_id}"),
            CacheKey::Song { game_id, song_id } => write!(f, "song {song_id} (game {game_id})"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// Directory that holds the resource's snapshot and its downloads.
    pub fn resource_dir(&self, key: &CacheKey) -> PathBuf {
        match key {
            CacheKey::Catalog => self.root.clone(),
            CacheKey::Game(game_id) => self.root.join(game_id.to_string()),
            CacheKey::Song { game_id, song_id } => self
                .root
                .join(game_id.to_string())
                .join(song_id.to_string()),
        }
    }

    pub fn exists(&self, key: &CacheKey) -> bool {
        self.path(key).is_file()
    }

    /// Loads the snapshot for `key`.
    ///
    /// A missing file is `Ok(None)`. A file that exists but cannot be read or
    /// decoded as `T` is [`CatalogError::CorruptCache`].
    pub fn load<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>> {
        let path = self.path(key);
        let body = match std::fs::read_to_string(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CatalogError::CorruptCache {
                    path,
                    reason: e.to_string(),
                });
            }
        };

        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| CatalogError::CorruptCache {
                path,
                reason: e.to_string(),
            })
    }

    /// Writes `body` verbatim as the snapshot for `key`.
    pub fn save(&self, key: &CacheKey, body: &str) -> Result<()> {
        let path = self.path(key);
        debug!(resource = %key, path = %path.display(), "writing snapshot");
        write_atomic(&path, body.as_bytes())
    }
}

/// Replaces `path` with `data` through a temp file in the same directory,
/// creating missing parent directories first.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let write_err = |source: std::io::Error| CatalogError::CacheWrite {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    // Same directory as the target so the rename never crosses filesystems.
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(data).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}
