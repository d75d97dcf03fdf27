use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "muse", version, about = "Muse lyrics cache and configuration tools")]
pub struct Cli {
    /// Lyrics cache directory (overrides `lyrics.cache_dir`)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Work with cached lyric documents
    #[command(subcommand)]
    Lyrics(LyricsCommand),
    /// Inspect or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum LyricsCommand {
    /// Download lyrics for a song into the cache
    Fetch(FetchArgs),
    /// Print cached lyrics
    Show(SongArgs),
    /// List cached lyric documents
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Delete cached lyrics for a song
    Remove(SongArgs),
}

#[derive(Debug, Args)]
pub struct SongArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub artist: String,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub song: SongArgs,

    #[arg(long)]
    pub album: Option<String>,

    /// Track length in seconds, used to pick the closest match
    #[arg(long, value_name = "SECONDS")]
    pub duration: Option<u32>,

    /// Replace an existing cached document
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the configuration file path
    Path,
    /// Write the default configuration template
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
