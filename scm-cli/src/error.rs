use scm_catalog::CatalogError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Catalog(#[from] CatalogError),

    #[error("Configuration error: {0:#}")]
    Config(#[from] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Initialization failed: {0}")]
    Initialization(String),
}

pub type Result<T> = std::result::Result<T, CliError>;
