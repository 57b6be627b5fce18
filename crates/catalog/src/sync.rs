//! Three-level catalog walk: index, then every game, then (optionally) every song.

use std::future::Future;

use futures::{StreamExt, TryStreamExt, stream};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheStore};
use crate::client::{CatalogSource, Fetched};
use crate::error::{CatalogError, Result};
use crate::events::{OnSyncEvent, Outcome, Stage, SyncEvent};
use crate::models::{CatalogIndexEntry, GameRecord, SongDetail, SongRecord};
use crate::staleness::{Freshness, StalenessPolicy};

/// Whether song details are resolved during the run or left to the downloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SongResolution {
    /// Song details are fetched at download time through the manifest.
    #[default]
    Lazy,
    /// Every song detail is fetched or reused now.
    Eager,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub songs: SongResolution,
    /// Upper bound on resolutions in flight at once. Results keep catalog order.
    pub concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            songs: SongResolution::Lazy,
            concurrency: 1,
        }
    }
}

/// Counters gathered while walking the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub total_songs: u64,
    pub games_with_banner: u64,
    pub catalog_reused: bool,
    pub games_fetched: u64,
    pub games_reused: u64,
    pub songs_fetched: u64,
    pub songs_reused: u64,
    pub songs_failed: u64,
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Games in catalog order, songs in game-detail order.
    pub games: Vec<GameRecord>,
    pub summary: SyncSummary,
}

pub struct CatalogSynchronizer<S> {
    source: S,
    store: CacheStore,
    policy: StalenessPolicy,
    options: SyncOptions,
    on_event: Option<OnSyncEvent>,
}

impl<S: CatalogSource> CatalogSynchronizer<S> {
    pub fn new(source: S, store: CacheStore) -> Self {
        Self {
            source,
            store,
            policy: StalenessPolicy::default(),
            options: SyncOptions::default(),
            on_event: None,
        }
    }

    pub fn with_policy(mut self, policy: StalenessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn on_event(mut self, on_event: OnSyncEvent) -> Self {
        self.on_event = Some(on_event);
        self
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mirrors the catalog into the cache root and returns the synchronized tree.
    ///
    /// Failing to resolve the index or any game aborts the run with
    /// [`CatalogError::Aborted`]; snapshots written before the failure stay on
    /// disk. In [`SongResolution::Eager`] mode a song that cannot be resolved
    /// is logged and counted, and the run continues.
    pub async fn synchronize(&self) -> Result<SyncReport> {
        let mut summary = SyncSummary::default();

        self.emit(SyncEvent::StageStarted {
            stage: Stage::Catalog,
            total: 1,
        });
        let (index, outcome) = self
            .resolve(
                CacheKey::Catalog,
                |cached| self.policy.catalog(cached),
                || self.source.fetch_index(),
            )
            .await
            .map_err(|e| CatalogError::aborted(CacheKey::Catalog.to_string(), e))?;
        summary.catalog_reused = outcome == Outcome::Reused;
        self.emit(SyncEvent::Resolved {
            stage: Stage::Catalog,
            label: "index".to_string(),
            outcome,
        });
        self.emit(SyncEvent::StageFinished {
            stage: Stage::Catalog,
        });
        info!(
            games = index.games.len(),
            reused = summary.catalog_reused,
            "Catalog index resolved"
        );

        self.emit(SyncEvent::StageStarted {
            stage: Stage::Games,
            total: index.games.len() as u64,
        });
        let resolved: Vec<(GameRecord, Outcome)> = stream::iter(&index.games)
            .map(|entry| self.resolve_game(entry))
            .buffered(self.concurrency())
            .try_collect()
            .await?;
        self.emit(SyncEvent::StageFinished {
            stage: Stage::Games,
        });

        let mut games = Vec::with_capacity(resolved.len());
        for (game, outcome) in resolved {
            match outcome {
                Outcome::Reused => summary.games_reused += 1,
                _ => summary.games_fetched += 1,
            }
            summary.total_songs += game.songs.len() as u64;
            if game.has_banner {
                summary.games_with_banner += 1;
            }
            games.push(game);
        }
        info!(
            games = games.len(),
            fetched = summary.games_fetched,
            reused = summary.games_reused,
            songs = summary.total_songs,
            banners = summary.games_with_banner,
            "Game details resolved"
        );

        if self.options.songs == SongResolution::Eager {
            self.resolve_songs(&games, &mut summary).await;
        }

        Ok(SyncReport { games, summary })
    }

    async fn resolve_game(&self, entry: &CatalogIndexEntry) -> Result<(GameRecord, Outcome)> {
        let key = CacheKey::Game(entry.game_id);
        let (detail, outcome) = self
            .resolve(
                key,
                |cached| self.policy.game(entry, cached),
                || self.source.fetch_game(entry.game_id),
            )
            .await
            .map_err(|e| CatalogError::aborted(format!("{key} \"{}\"", entry.game_name), e))?;

        self.emit(SyncEvent::Resolved {
            stage: Stage::Games,
            label: format!("[{}] \"{}\"", entry.game_id, entry.game_name),
            outcome,
        });

        Ok((GameRecord::from_detail(entry.game_id, detail), outcome))
    }

    async fn resolve_songs(&self, games: &[GameRecord], summary: &mut SyncSummary) {
        let songs: Vec<(&GameRecord, &SongRecord)> = games
            .iter()
            .flat_map(|game| game.songs.iter().map(move |song| (game, song)))
            .collect();

        self.emit(SyncEvent::StageStarted {
            stage: Stage::Songs,
            total: songs.len() as u64,
        });
        let outcomes: Vec<Outcome> = stream::iter(songs)
            .map(|(game, song)| self.resolve_song(game, song))
            .buffered(self.concurrency())
            .collect()
            .await;
        self.emit(SyncEvent::StageFinished {
            stage: Stage::Songs,
        });

        for outcome in outcomes {
            match outcome {
                Outcome::Reused => summary.songs_reused += 1,
                Outcome::Fetched => summary.songs_fetched += 1,
                Outcome::Failed => summary.songs_failed += 1,
            }
        }
        info!(
            fetched = summary.songs_fetched,
            reused = summary.songs_reused,
            failed = summary.songs_failed,
            "Song details resolved"
        );
    }

    async fn resolve_song(&self, game: &GameRecord, song: &SongRecord) -> Outcome {
        let key = CacheKey::Song {
            game_id: game.id,
            song_id: song.id,
        };
        let outcome = match self
            .resolve::<SongDetail, _, _>(
                key,
                |cached| self.policy.song(song, cached),
                || self.source.fetch_song(song.id),
            )
            .await
        {
            Ok((_, outcome)) => outcome,
            Err(e) => {
                warn!(resource = %key, error = %e, "Skipping song detail");
                Outcome::Failed
            }
        };

        self.emit(SyncEvent::Resolved {
            stage: Stage::Songs,
            label: format!(
                "[{}] \"{}\" / [{}] \"{}\"",
                game.id, game.name, song.id, song.name
            ),
            outcome,
        });
        outcome
    }

    /// Reuses the snapshot for `key` when `decide` allows it, otherwise fetches
    /// the resource and writes the fetched body as the new snapshot.
    async fn resolve<T, F, Fut>(
        &self,
        key: CacheKey,
        decide: impl FnOnce(Option<&T>) -> Freshness,
        fetch: F,
    ) -> Result<(T, Outcome)>
    where
        T: DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Fetched<T>>>,
    {
        let cached = match self.store.load::<T>(&key) {
            Ok(cached) => cached,
            Err(e) => {
                warn!(resource = %key, error = %e, "Ignoring unreadable snapshot");
                None
            }
        };

        let freshness = decide(cached.as_ref());
        if let (Freshness::Reuse, Some(cached)) = (freshness, cached) {
            debug!(resource = %key, "Cache hit");
            return Ok((cached, Outcome::Reused));
        }

        debug!(resource = %key, "Cache miss or stale snapshot");
        let Fetched { body, data } = fetch().await?;
        self.store.save(&key, &body)?;
        Ok((data, Outcome::Fetched))
    }

    fn concurrency(&self) -> usize {
        self.options.concurrency.max(1)
    }

    fn emit(&self, event: SyncEvent) {
        if let Some(on_event) = &self.on_event {
            on_event(event);
        }
    }
}
