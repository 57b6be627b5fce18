use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::endpoints::Endpoints;
use crate::error::{CatalogError, Result};
use crate::models::{CatalogIndex, GameDetail, SongDetail};

pub(crate) const DEFAULT_UA: &str = concat!("scm-archiver/", env!("CARGO_PKG_VERSION"));

/// A decoded remote document together with the exact body it was decoded
/// from. The body is what gets cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched<T> {
    pub body: String,
    pub data: T,
}

/// Source of catalog documents.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_index(&self) -> Result<Fetched<CatalogIndex>>;

    async fn fetch_game(&self, game_id: u64) -> Result<Fetched<GameDetail>>;

    async fn fetch_song(&self, song_id: u64) -> Result<Fetched<SongDetail>>;
}

#[async_trait]
impl<T: CatalogSource + ?Sized> CatalogSource for Arc<T> {
    async fn fetch_index(&self) -> Result<Fetched<CatalogIndex>> {
        (**self).fetch_index().await
    }

    async fn fetch_game(&self, game_id: u64) -> Result<Fetched<GameDetail>> {
        (**self).fetch_game(game_id).await
    }

    async fn fetch_song(&self, song_id: u64) -> Result<Fetched<SongDetail>> {
        (**self).fetch_song(song_id).await
    }
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// HTTP settings for [`HttpCatalogClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Overall timeout for each request
    pub timeout: Duration,

    /// Time allowed to establish a connection
    pub connect_timeout: Duration,

    pub user_agent: String,

    pub proxy: Option<ProxyConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_UA.to_owned(),
            proxy: None,
        }
    }
}

/// [`CatalogSource`] backed by the catalog's JSON API.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    client: Client,
    endpoints: Endpoints,
}

impl HttpCatalogClient {
    pub fn new(endpoints: Endpoints, config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str());

        if let Some(proxy_config) = &config.proxy {
            match reqwest::Proxy::all(&proxy_config.url) {
                Ok(mut proxy) => {
                    if let (Some(username), Some(password)) =
                        (&proxy_config.username, &proxy_config.password)
                    {
                        proxy = proxy.basic_auth(username, password);
                    }
                    builder = builder.proxy(proxy);
                }
                Err(e) => {
                    warn!(proxy = %proxy_config.url, error = %e, "Ignoring invalid proxy");
                }
            }
        }

        Ok(Self {
            client: builder.build()?,
            endpoints,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Fetches `url` and decodes it as `T`. Non-success statuses and bodies
    /// that do not decode are both reported as remote failures.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<Fetched<T>> {
        debug!(url = %url, "Fetching");
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::RemoteStatus {
                url: url.into(),
                status,
            });
        }

        let body = response.text().await?;
        let data = serde_json::from_str(&body).map_err(|source| {
            CatalogError::MalformedResponse {
                url: url.to_string(),
                source,
            }
        })?;

        Ok(Fetched { body, data })
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogClient {
    async fn fetch_index(&self) -> Result<Fetched<CatalogIndex>> {
        self.get_json(self.endpoints.index()).await
    }

    async fn fetch_game(&self, game_id: u64) -> Result<Fetched<GameDetail>> {
        self.get_json(self.endpoints.game(game_id)).await
    }

    async fn fetch_song(&self, song_id: u64) -> Result<Fetched<SongDetail>> {
        self.get_json(self.endpoints.song(song_id)).await
    }
}
