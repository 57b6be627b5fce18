//! Wire payloads of the catalog API and the synchronized tree built from them.

use serde::{Deserialize, Deserializer, Serialize};

/// `GET /json/gamelist/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogIndex {
    #[serde(default)]
    pub game_count: u64,
    #[serde(default)]
    pub games: Vec<CatalogIndexEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogIndexEntry {
    pub game_id: u64,
    pub game_name: String,
    #[serde(default)]
    pub song_count: u64,
}

/// `GET /json/game/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDetail {
    pub game_name: String,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub game_banner_exists: bool,
    #[serde(default)]
    pub track_count: u64,
    #[serde(default)]
    pub songs: Vec<SongSummary>,
}

/// Song entry embedded in a game detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongSummary {
    pub song_id: u64,
    pub song_name: String,
    #[serde(default)]
    pub song_uploader: Option<String>,
    #[serde(default, deserialize_with = "flexible_opt_bool")]
    pub song_available: Option<bool>,
    #[serde(default, deserialize_with = "flexible_opt_bool")]
    pub song_remix: Option<bool>,
    #[serde(default, deserialize_with = "flexible_string")]
    pub song_loop: String,
}

/// `GET /json/song/{id}`. Only the fields compared by the staleness policy are
/// decoded; the snapshot on disk keeps the full body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongDetail {
    pub song_name: String,
    #[serde(default)]
    pub song_uploader: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameRecord {
    pub id: u64,
    pub name: String,
    pub has_banner: bool,
    pub songs: Vec<SongRecord>,
}

impl GameRecord {
    /// Builds the record for `game_id` from its detail payload. Songs keep the
    /// detail's order and are stamped with `game_id`.
    pub fn from_detail(game_id: u64, detail: GameDetail) -> Self {
        let songs = detail
            .songs
            .into_iter()
            .map(|song| SongRecord::from_summary(game_id, song))
            .collect();

        Self {
            id: game_id,
            name: detail.game_name,
            has_banner: detail.game_banner_exists,
            songs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongRecord {
    pub id: u64,
    pub name: String,
    /// Empty when the catalog has no uploader for the song.
    pub uploader: String,
    pub remix: Option<bool>,
    pub available: Option<bool>,
    pub game_id: u64,
    /// Empty when the catalog has no loop information.
    pub loop_type: String,
}

impl SongRecord {
    pub fn from_summary(game_id: u64, summary: SongSummary) -> Self {
        Self {
            id: summary.song_id,
            name: summary.song_name,
            uploader: summary.song_uploader.unwrap_or_default(),
            remix: summary.song_remix,
            available: summary.song_available,
            game_id,
            loop_type: summary.song_loop,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolLike {
    Bool(bool),
    Int(i64),
}

impl From<BoolLike> for bool {
    fn from(value: BoolLike) -> Self {
        match value {
            BoolLike::Bool(b) => b,
            BoolLike::Int(n) => n != 0,
        }
    }
}

// The API reports some flags as `0`/`1` instead of JSON booleans.
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BoolLike>::deserialize(deserializer)?.is_some_and(bool::from))
}

fn flexible_opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BoolLike>::deserialize(deserializer)?.map(bool::from))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringLike {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

fn flexible_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<StringLike>::deserialize(deserializer)? {
        Some(StringLike::Str(s)) => s,
        Some(StringLike::Int(n)) => n.to_string(),
        Some(StringLike::Float(f)) => f.to_string(),
        Some(StringLike::Bool(b)) => b.to_string(),
        None => String::new(),
    })
}
