//! Decides whether a cached snapshot can stand in for a remote fetch.
//!
//! Each level is judged only against what its parent response already told us,
//! so the policy never needs the network.

use crate::models::{CatalogIndex, CatalogIndexEntry, GameDetail, SongDetail, SongRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Reuse,
    Refresh,
}

impl Freshness {
    fn from_match(matches: bool) -> Self {
        if matches {
            Freshness::Reuse
        } else {
            Freshness::Refresh
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StalenessPolicy {
    ignore_cache: bool,
}

impl StalenessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that refreshes every resource regardless of its snapshot.
    pub fn ignoring_cache() -> Self {
        Self { ignore_cache: true }
    }

    pub fn ignores_cache(&self) -> bool {
        self.ignore_cache
    }

    /// The index is trusted for as long as a snapshot of it exists.
    pub fn catalog(&self, cached: Option<&CatalogIndex>) -> Freshness {
        self.judge(cached, |_| true)
    }

    pub fn game(&self, summary: &CatalogIndexEntry, cached: Option<&GameDetail>) -> Freshness {
        self.judge(cached, |cached| {
            cached.game_name == summary.game_name && cached.track_count == summary.song_count
        })
    }

    /// A null uploader in the snapshot compares equal to an empty one, the
    /// same default the song record applies.
    pub fn song(&self, summary: &SongRecord, cached: Option<&SongDetail>) -> Freshness {
        self.judge(cached, |cached| {
            cached.song_name == summary.name
                && cached.song_uploader.as_deref().unwrap_or_default() == summary.uploader
        })
    }

    fn judge<T>(&self, cached: Option<&T>, matches: impl FnOnce(&T) -> bool) -> Freshness {
        match cached {
            _ if self.ignore_cache => Freshness::Refresh,
            None => Freshness::Refresh,
            Some(cached) => Freshness::from_match(matches(cached)),
        }
    }
}
