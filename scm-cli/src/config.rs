use anyhow::{Context, Result};
use scm_catalog::{ClientConfig, DEFAULT_BASE_URL, ProxyConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Args;

const APP_NAME: &str = "scm-archiver";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the catalog service
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Maximum number of concurrent requests
    pub concurrency: usize,

    /// User agent string for requests
    pub user_agent: Option<String>,

    /// Name audio files after the song by default
    pub name_output_files: bool,

    /// Show progress bars
    pub show_progress: bool,

    /// Default proxy URL (supports http, https, socks5)
    pub proxy: Option<String>,

    /// Default proxy username (if proxy requires authentication)
    pub proxy_username: Option<String>,

    /// Default proxy password (if proxy requires authentication)
    pub proxy_password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            concurrency: 1,
            user_agent: None,
            name_output_files: false,
            show_progress: true,
            proxy: None,
            proxy_username: None,
            proxy_password: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) => {
                if path.exists() {
                    let content = std::fs::read_to_string(path)
                        .context("Failed to read configuration file")?;
                    toml::from_str(&content).context("Failed to parse configuration file")
                } else {
                    Ok(Self::default())
                }
            }
            None => confy::load(APP_NAME, None).context("Failed to load configuration"),
        }
    }

    /// Get default configuration file path
    pub fn default_config_path() -> Option<PathBuf> {
        confy::get_configuration_file_path(APP_NAME, None).ok()
    }

    /// Command-line flags take precedence over the file.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(base_url) = &args.base_url {
            self.base_url = base_url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.timeout_secs = timeout;
        }
        if let Some(jobs) = args.jobs {
            self.concurrency = jobs;
        }
        if args.name_files {
            self.name_output_files = true;
        }
        if args.no_progress || args.quiet {
            self.show_progress = false;
        }
        if args.proxy.is_some() {
            self.proxy = args.proxy.clone();
            self.proxy_username = args.proxy_username.clone();
            self.proxy_password = args.proxy_password.clone();
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            proxy: self.proxy.as_ref().map(|url| ProxyConfig {
                url: url.clone(),
                username: self.proxy_username.clone(),
                password: self.proxy_password.clone(),
            }),
        }
    }

    /// Show current configuration as a formatted string
    pub fn show(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration for display")
    }
}
