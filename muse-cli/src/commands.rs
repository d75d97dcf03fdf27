//! Subcommand implementations.

use chrono::{DateTime, Utc};
use muse_core::config::LyricsProviderType;
use muse_core::{
    CachedLyricsFile, CoreError, LyricsCache, LyricsFetcher, LyricsProvider, LyricsQuery,
    MuseConfig, PrefetchOutcome,
};
use muse_lyrics_lrclib::LrclibProvider;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cli::{Cli, Command, ConfigCommand, FetchArgs, LyricsCommand, SongArgs};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("No lyrics cached for {artist} - {title}")]
    NotCached { title: String, artist: String },

    #[error("No lyrics providers are enabled")]
    NoProviders,

    #[error("Lyrics download cancelled")]
    Cancelled,

    #[error("Lyrics were found but could not be written to {}", .dir.display())]
    CacheWriteFailed { dir: PathBuf },

    #[error("Config file already exists at {} (use --force to overwrite)", .path.display())]
    ConfigExists { path: PathBuf },

    #[error("Failed to encode listing: {0}")]
    Json(#[from] serde_json::Error),
}

pub async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Config(ConfigCommand::Path) => {
            println!("{}", MuseConfig::config_path().display());
            Ok(())
        }
        Command::Config(ConfigCommand::Init { force }) => {
            let path = init_config(&MuseConfig::config_path(), force)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Command::Lyrics(command) => {
            let config = load_config()?;
            let cache = Arc::new(LyricsCache::new(
                cli.cache_dir.unwrap_or_else(|| config.lyrics.cache_dir()),
            ));
            run_lyrics(command, &config, cache).await
        }
    }
}

/// Load the config, bootstrapping the template on first run
fn load_config() -> Result<MuseConfig, CliError> {
    match MuseConfig::load_or_create() {
        Ok(config) => Ok(config),
        Err(CoreError::ConfigNotFound { path }) => {
            info!("Created default config at {}", path.display());
            Ok(MuseConfig::default())
        }
        Err(e) => Err(e.into()),
    }
}

fn init_config(path: &Path, force: bool) -> Result<PathBuf, CliError> {
    if path.exists() && !force {
        return Err(CliError::ConfigExists {
            path: path.to_path_buf(),
        });
    }
    MuseConfig::write_template(path)?;
    Ok(path.to_path_buf())
}

async fn run_lyrics(
    command: LyricsCommand,
    config: &MuseConfig,
    cache: Arc<LyricsCache>,
) -> Result<(), CliError> {
    match command {
        LyricsCommand::Fetch(args) => fetch(args, config, cache).await,
        LyricsCommand::Show(SongArgs { title, artist }) => {
            if !cache.contains(&title, &artist).await {
                return Err(CliError::NotCached { title, artist });
            }
            print!("{}", cache.read(&title, &artist).await);
            Ok(())
        }
        LyricsCommand::List { json } => {
            let files = cache.list().await?;
            if json {
                let listed: Vec<_> = files.iter().map(ListedFile::from).collect();
                println!("{}", serde_json::to_string_pretty(&listed)?);
            } else if files.is_empty() {
                println!("No cached lyrics in {}", cache.dir().display());
            } else {
                for file in &files {
                    println!("{}", format_listing_row(file));
                }
            }
            Ok(())
        }
        LyricsCommand::Remove(SongArgs { title, artist }) => {
            if cache.remove(&title, &artist).await? {
                println!("Removed lyrics for {artist} - {title}");
                Ok(())
            } else {
                Err(CliError::NotCached { title, artist })
            }
        }
    }
}

async fn fetch(
    args: FetchArgs,
    config: &MuseConfig,
    cache: Arc<LyricsCache>,
) -> Result<(), CliError> {
    let FetchArgs {
        song: SongArgs { title, artist },
        album,
        duration,
        force,
    } = args;

    let providers = create_providers(config);
    if providers.is_empty() {
        return Err(CliError::NoProviders);
    }
    let provider_names: Vec<_> = providers.iter().map(|p| p.name()).collect();
    info!(
        "Initialized {} lyrics provider(s): {:?}",
        providers.len(),
        provider_names
    );

    // Ctrl+C aborts the search
    let cancel_token = CancellationToken::new();
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, cancelling...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    let fetcher = LyricsFetcher::new(
        Arc::clone(&cache),
        providers,
        config.lyrics.search_timeout(),
        Some(cancel_token),
    );

    let mut query = LyricsQuery::new(&title, &artist);
    if let Some(album) = album {
        query = query.with_album(album);
    }
    if let Some(duration) = duration {
        query = query.with_duration(duration);
    }

    let outcome = if force {
        fetcher.refresh(&query).await
    } else {
        fetcher.prefetch(&query).await
    };

    match outcome {
        PrefetchOutcome::Cached => {
            println!(
                "Already cached: {}",
                cache.path_for(&title, &artist).display()
            );
            Ok(())
        }
        PrefetchOutcome::Downloaded { path } => {
            println!("Saved {}", path.display());
            Ok(())
        }
        PrefetchOutcome::NotFound => Err(CoreError::LyricsNotFound {
            track: title,
            artist,
        }
        .into()),
        PrefetchOutcome::TimedOut => Err(CoreError::LyricsTimeout {
            timeout_secs: config.lyrics.search_timeout_secs,
        }
        .into()),
        PrefetchOutcome::Cancelled => Err(CliError::Cancelled),
        PrefetchOutcome::Failed => Err(CliError::CacheWriteFailed {
            dir: cache.dir().to_path_buf(),
        }),
    }
}

fn create_providers(config: &MuseConfig) -> Vec<Arc<dyn LyricsProvider>> {
    config
        .lyrics
        .providers
        .iter()
        .filter_map(|provider_type| -> Option<Arc<dyn LyricsProvider>> {
            match provider_type {
                LyricsProviderType::Lrclib => {
                    info!("Initializing LRCLIB provider");
                    match LrclibProvider::new() {
                        Ok(provider) => Some(Arc::new(provider)),
                        Err(e) => {
                            warn!("Failed to create LRCLIB provider: {}", e);
                            None
                        }
                    }
                }
            }
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct ListedFile {
    file_name: String,
    path: PathBuf,
    size_bytes: u64,
    modified_at: Option<DateTime<Utc>>,
}

impl From<&CachedLyricsFile> for ListedFile {
    fn from(file: &CachedLyricsFile) -> Self {
        Self {
            file_name: file.file_name.clone(),
            path: file.path.clone(),
            size_bytes: file.size_bytes,
            modified_at: file.modified_at,
        }
    }
}

fn format_listing_row(file: &CachedLyricsFile) -> String {
    let modified = file.modified_at.map_or_else(
        || "-".to_string(),
        |t| t.format("%Y-%m-%d %H:%M").to_string(),
    );
    format!("{:>9}  {:<16}  {}", file.size_bytes, modified, file.file_name)
}
