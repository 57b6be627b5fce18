use url::Url;

use crate::error::Result;

pub const DEFAULT_BASE_URL: &str = "https://smashcustommusic.net";

/// URL layout of the catalog service, derived from a single base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    const INDEX_PATH: &'static str = "json/gamelist/";
    const GAME_PATH: &'static str = "json/game/";
    const SONG_PATH: &'static str = "json/song/";
    const BANNER_PATH: &'static str = "logos/";
    const AUDIO_PATH: &'static str = "brstm/";

    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base)?;
        if base.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase.into());
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn index(&self) -> Url {
        self.join(Self::INDEX_PATH)
    }

    pub fn game(&self, game_id: u64) -> Url {
        self.join(&format!("{}{game_id}", Self::GAME_PATH))
    }

    pub fn song(&self, song_id: u64) -> Url {
        self.join(&format!("{}{song_id}", Self::SONG_PATH))
    }

    pub fn banner(&self, game_id: u64) -> Url {
        self.join(&format!("{}{game_id}.png", Self::BANNER_PATH))
    }

    /// Audio download; `noIncrement` keeps bulk mirroring out of the site's
    /// download counters.
    pub fn audio(&self, song_id: u64) -> Url {
        let mut url = self.join(&format!("{}{song_id}", Self::AUDIO_PATH));
        url.set_query(Some("noIncrement=1"));
        url
    }

    fn join(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        // `new` rejects cannot-be-a-base urls, so the segments are always available.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(path.split('/'));
        }
        url
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL).expect("default base url is valid")
    }
}
