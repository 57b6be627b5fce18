//! In-memory catalog source and payload builders for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::client::{CatalogSource, Fetched};
use crate::error::{CatalogError, Result};
use crate::models::{CatalogIndex, GameDetail, SongDetail};

/// Macro to initialize tracing for tests
///
/// Usage:
/// - `init_test_tracing!()` - uses DEBUG level (default)
/// - `init_test_tracing!(INFO)` - uses specified level
#[macro_export]
macro_rules! init_test_tracing {
    () => {
        $crate::init_test_tracing!(DEBUG);
    };
    ($level:ident) => {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::$level)
            .with_test_writer()
            .try_init();
    };
}

pub use crate::init_test_tracing;

/// A request made against a [`ScriptedSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Request {
    Index,
    Game(u64),
    Song(u64),
}

#[derive(Debug, Default)]
struct Script {
    index: Option<String>,
    games: HashMap<u64, String>,
    songs: HashMap<u64, String>,
    failing: HashSet<Request>,
    calls: Vec<Request>,
}

/// A [`CatalogSource`] serving scripted bodies and recording every request.
///
/// Unscripted resources answer `404`, resources marked with
/// [`ScriptedSource::fail`] answer `500`.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: Mutex<Script>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_index(&self, body: impl Into<String>) {
        self.script.lock().unwrap().index = Some(body.into());
    }

    pub fn set_game(&self, game_id: u64, body: impl Into<String>) {
        self.script.lock().unwrap().games.insert(game_id, body.into());
    }

    pub fn set_song(&self, song_id: u64, body: impl Into<String>) {
        self.script.lock().unwrap().songs.insert(song_id, body.into());
    }

    pub fn fail(&self, request: Request) {
        self.script.lock().unwrap().failing.insert(request);
    }

    pub fn calls(&self) -> Vec<Request> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn count(&self, request: Request) -> usize {
        self.calls().into_iter().filter(|r| *r == request).count()
    }

    pub fn clear_calls(&self) {
        self.script.lock().unwrap().calls.clear();
    }

    fn serve<T: DeserializeOwned>(&self, request: Request) -> Result<Fetched<T>> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(request);

        let url = format!("scripted://{request:?}");
        if script.failing.contains(&request) {
            return Err(CatalogError::RemoteStatus {
                url,
                status: StatusCode::INTERNAL_SERVER_ERROR,
            });
        }

        let body = match request {
            Request::Index => script.index.clone(),
            Request::Game(id) => script.games.get(&id).cloned(),
            Request::Song(id) => script.songs.get(&id).cloned(),
        };
        let Some(body) = body else {
            return Err(CatalogError::RemoteStatus {
                url,
                status: StatusCode::NOT_FOUND,
            });
        };

        let data = serde_json::from_str(&body)
            .map_err(|source| CatalogError::MalformedResponse { url, source })?;
        Ok(Fetched { body, data })
    }
}

#[async_trait]
impl CatalogSource for ScriptedSource {
    async fn fetch_index(&self) -> Result<Fetched<CatalogIndex>> {
        self.serve(Request::Index)
    }

    async fn fetch_game(&self, game_id: u64) -> Result<Fetched<GameDetail>> {
        self.serve(Request::Game(game_id))
    }

    async fn fetch_song(&self, song_id: u64) -> Result<Fetched<SongDetail>> {
        self.serve(Request::Song(song_id))
    }
}

/// Index body listing `(game_id, game_name, song_count)`.
pub fn index_body(games: &[(u64, &str, u64)]) -> String {
    let games: Vec<_> = games
        .iter()
        .map(|(game_id, game_name, song_count)| {
            json!({ "game_id": game_id, "game_name": game_name, "song_count": song_count })
        })
        .collect();
    json!({ "game_count": games.len(), "games": games }).to_string()
}

/// Game detail body with songs given as `(song_id, song_name, uploader)`.
pub fn game_body(name: &str, has_banner: bool, songs: &[(u64, &str, Option<&str>)]) -> String {
    let songs: Vec<_> = songs
        .iter()
        .map(|(song_id, song_name, uploader)| {
            json!({
                "song_id": song_id,
                "song_name": song_name,
                "song_uploader": uploader,
                "song_available": 1,
                "song_loop": "Normal",
            })
        })
        .collect();
    json!({
        "game_name": name,
        "game_banner_exists": u8::from(has_banner),
        "track_count": songs.len(),
        "songs": songs,
    })
    .to_string()
}

pub fn song_body(name: &str, uploader: Option<&str>) -> String {
    json!({
        "song_name": name,
        "song_uploader": uploader,
        "song_length": 120,
    })
    .to_string()
}
