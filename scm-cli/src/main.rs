mod cli;
mod config;
mod error;
mod progress;

use crate::{
    cli::Args,
    config::AppConfig,
    error::{CliError, Result},
    progress::ProgressManager,
};
use clap::Parser;
use scm_catalog::{
    CacheStore, CatalogSynchronizer, Endpoints, HttpCatalogClient, MANIFEST_FILE,
    ManifestCompiler, ManifestOptions, SongResolution, StalenessPolicy, SyncOptions,
};
use std::process;
use tracing::{Level, debug, error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        error!("Application error: {}", e);
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet)?;

    // Load configuration
    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply_args(&args);

    if args.show_config {
        if let Some(path) = args.config.clone().or_else(AppConfig::default_config_path) {
            println!("# {}", path.display());
        }
        println!("{}", config.show()?);
        return Ok(());
    }

    debug!("Effective configuration: {:?}", config);

    let download_path = std::path::absolute(&args.download_path)?;
    let songs = if args.eager_songs {
        SongResolution::Eager
    } else {
        SongResolution::Lazy
    };
    let policy = if args.ignore_cache {
        StalenessPolicy::ignoring_cache()
    } else {
        StalenessPolicy::new()
    };
    info!(
        path = %download_path.display(),
        songs = ?songs,
        ignore_cache = args.ignore_cache,
        "Mirroring catalog from {}",
        config.base_url
    );

    let endpoints = Endpoints::new(&config.base_url)?;
    let client = HttpCatalogClient::new(endpoints.clone(), &config.client_config())?;

    let progress = if config.show_progress {
        ProgressManager::new()
    } else {
        ProgressManager::disabled()
    };

    let synchronizer = CatalogSynchronizer::new(client, CacheStore::new(&download_path))
        .with_policy(policy)
        .with_options(SyncOptions {
            songs,
            concurrency: config.concurrency,
        })
        .on_event(progress.callback());

    let report = match synchronizer.synchronize().await {
        Ok(report) => report,
        Err(e) => {
            progress.finish("Synchronization failed");
            return Err(CliError::from(e));
        }
    };

    let options = ManifestOptions {
        inline_song_metadata: args.inline_metadata(),
        name_output_files: config.name_output_files,
    };
    let manifest = ManifestCompiler::new(endpoints, &download_path, options).compile(&report.games);
    let manifest_path = args
        .manifest
        .clone()
        .unwrap_or_else(|| download_path.join(MANIFEST_FILE));
    manifest.write_to(&manifest_path)?;

    let summary = &report.summary;
    info!(
        games = report.games.len(),
        songs = summary.total_songs,
        banners = summary.games_with_banner,
        games_fetched = summary.games_fetched,
        songs_fetched = summary.songs_fetched,
        songs_failed = summary.songs_failed,
        "Catalog synchronized"
    );
    info!(
        entries = manifest.len(),
        path = %manifest_path.display(),
        "Download list written"
    );

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_level(verbose))
        .with(filter)
        .try_init()
        .map_err(|e| CliError::Initialization(e.to_string()))
}
