use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote returned {status} for {url}")]
    RemoteStatus { url: String, status: StatusCode },
    #[error("malformed response from {url}: {source}")]
    MalformedResponse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("corrupt cache snapshot at {}: {reason}", .path.display())]
    CorruptCache { path: PathBuf, reason: String },
    #[error("failed to write {}: {source}", .path.display())]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("run aborted while resolving {resource}: {source}")]
    Aborted {
        resource: String,
        #[source]
        source: Box<CatalogError>,
    },
}

impl CatalogError {
    /// Wraps a fatal failure so the caller can tell which resource stopped the run.
    pub fn aborted(resource: impl Into<String>, source: CatalogError) -> Self {
        Self::Aborted {
            resource: resource.into(),
            source: Box::new(source),
        }
    }

    /// True for failures reported by the remote service itself, as opposed to
    /// the network or the local disk.
    pub fn is_remote(&self) -> bool {
        match self {
            Self::RemoteStatus { .. } | Self::MalformedResponse { .. } => true,
            Self::Aborted { source, .. } => source.is_remote(),
            _ => false,
        }
    }

    pub fn is_transport(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Aborted { source, .. } => source.is_transport(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
