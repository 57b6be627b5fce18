//! Compiles the synchronized tree into an aria2 input file.
//!
//! Each entry is a URL line followed by indented `dir=`/`out=` options and a
//! blank line. Every game that contributes entries is introduced by a
//! `# <game name>` comment.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::cache::{CacheKey, CacheStore, write_atomic};
use crate::endpoints::Endpoints;
use crate::error::Result;
use crate::models::{GameRecord, SongRecord};

/// File name of the manifest inside the archive root.
pub const MANIFEST_FILE: &str = "aria2_input";

const BANNER_FILE: &str = "banner.png";
const METADATA_FILE: &str = "data.json";
const AUDIO_EXTENSION: &str = "brstm";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManifestOptions {
    /// Emit a song metadata download right after every audio download.
    pub inline_song_metadata: bool,
    /// Name audio files after the song instead of letting the downloader pick.
    pub name_output_files: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Banner,
    Audio,
    Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub kind: EntryKind,
    pub url: Url,
    pub dir: PathBuf,
    pub out: Option<String>,
}

/// The entries contributed by one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSection {
    pub game_id: u64,
    pub title: String,
    pub entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    sections: Vec<ManifestSection>,
}

impl Manifest {
    pub fn sections(&self) -> &[ManifestSection] {
        &self.sections
    }

    /// All entries in download order.
    pub fn entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.sections.iter().flat_map(|section| section.entries.iter())
    }

    pub fn len(&self) -> usize {
        self.sections.iter().map(|section| section.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Atomically replaces `path` with the rendered manifest.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        write_atomic(path, self.render().as_bytes())
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            writeln!(f, "# {}", single_line(&section.title))?;
            for entry in &section.entries {
                writeln!(f, "{}", entry.url)?;
                writeln!(f, "  dir={}", entry.dir.display())?;
                if let Some(out) = &entry.out {
                    writeln!(f, "  out={out}")?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

pub struct ManifestCompiler {
    endpoints: Endpoints,
    store: CacheStore,
    options: ManifestOptions,
}

impl ManifestCompiler {
    pub fn new(endpoints: Endpoints, cache_root: impl Into<PathBuf>, options: ManifestOptions) -> Self {
        Self {
            endpoints,
            store: CacheStore::new(cache_root),
            options,
        }
    }

    pub fn options(&self) -> ManifestOptions {
        self.options
    }

    /// Builds the manifest for `games`, keeping their order and the order of
    /// their songs. Games with neither a banner nor songs are left out.
    pub fn compile(&self, games: &[GameRecord]) -> Manifest {
        let sections = games
            .iter()
            .filter_map(|game| self.compile_game(game))
            .collect();
        Manifest { sections }
    }

    fn compile_game(&self, game: &GameRecord) -> Option<ManifestSection> {
        let mut entries = Vec::new();

        if game.has_banner {
            entries.push(ManifestEntry {
                kind: EntryKind::Banner,
                url: self.endpoints.banner(game.id),
                dir: self.store.resource_dir(&CacheKey::Game(game.id)),
                out: Some(BANNER_FILE.to_string()),
            });
        }

        for song in &game.songs {
            self.compile_song(song, &mut entries);
        }

        if entries.is_empty() {
            return None;
        }

        Some(ManifestSection {
            game_id: game.id,
            title: game.name.clone(),
            entries,
        })
    }

    fn compile_song(&self, song: &SongRecord, entries: &mut Vec<ManifestEntry>) {
        let dir = self.store.resource_dir(&CacheKey::Song {
            game_id: song.game_id,
            song_id: song.id,
        });

        let out = self
            .options
            .name_output_files
            .then(|| format!("{}.{AUDIO_EXTENSION}", file_stem(song)));
        entries.push(ManifestEntry {
            kind: EntryKind::Audio,
            url: self.endpoints.audio(song.id),
            dir: dir.clone(),
            out,
        });

        if self.options.inline_song_metadata {
            entries.push(ManifestEntry {
                kind: EntryKind::Metadata,
                url: self.endpoints.song(song.id),
                dir,
                out: Some(METADATA_FILE.to_string()),
            });
        }
    }
}

/// Song name made safe for use as a file name on any platform.
fn file_stem(song: &SongRecord) -> String {
    let stem: String = song
        .name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = stem.trim_end_matches(['.', ' ']).trim_start();

    if stem.is_empty() {
        song.id.to_string()
    } else {
        stem.to_string()
    }
}

fn single_line(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}
