use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "scm-archiver",
    about = "Mirror the custom music catalog to disk and compile an aria2 download list",
    long_about = "Mirrors the game and song catalog into DOWNLOAD_PATH, reusing every cached\n\
                  document that is still current, then writes an aria2 input file with the\n\
                  banners, song audio and (optionally) song metadata to download.\n\
                  \n\
                  Run `aria2c -i <DOWNLOAD_PATH>/aria2_input` afterwards to fetch the files.",
    version,
    author
)]
pub struct Args {
    /// Directory where the archive will reside
    #[arg(default_value = "archive")]
    pub download_path: PathBuf,

    /// Refetch every document even if a cached copy is still current
    #[arg(long)]
    pub ignore_cache: bool,

    /// Fetch song details now instead of leaving them to the downloader
    #[arg(long)]
    pub eager_songs: bool,

    /// Name audio files after the song instead of the downloader's default
    #[arg(long)]
    pub name_files: bool,

    /// Also list song metadata downloads when song details are fetched eagerly
    #[arg(long, conflicts_with = "no_inline_metadata")]
    pub inline_metadata: bool,

    /// Never list song metadata downloads
    #[arg(long)]
    pub no_inline_metadata: bool,

    /// Where to write the download list (default: <DOWNLOAD_PATH>/aria2_input)
    #[arg(short = 'o', long)]
    pub manifest: Option<PathBuf>,

    /// Maximum number of concurrent requests
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Base URL of the catalog service
    #[arg(long, env = "SCM_BASE_URL")]
    pub base_url: Option<String>,

    /// Proxy URL (supports http, https, socks5)
    #[arg(long)]
    pub proxy: Option<String>,

    /// Proxy username (if proxy requires authentication)
    #[arg(long)]
    pub proxy_username: Option<String>,

    /// Proxy password (if proxy requires authentication)
    #[arg(long)]
    pub proxy_password: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub show_config: bool,

    /// Hide progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Song metadata is listed by default only when song details are left to
    /// the downloader.
    pub fn inline_metadata(&self) -> bool {
        if self.no_inline_metadata {
            false
        } else {
            self.inline_metadata || !self.eager_songs
        }
    }
}
