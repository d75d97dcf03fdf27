pub mod cache;
pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod fetcher;
pub mod mirror;
pub mod paths;
pub mod playback;
pub mod player;
pub mod provider;
pub mod time;

#[cfg(test)]
mod test_support;

pub use cache::{CachedLyricsFile, LyricsCache};
pub use config::{
    LoggingConfig, LyricsConfig, LyricsProviderType, MuseConfig, PlayerConfig, CONFIG_TEMPLATE,
};

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;
pub use device::{AudioDeviceDirectory, AudioDeviceId, DeviceNameMap};
pub use error::{BackendError, CoreError, DeviceError, Result};
pub use event::{MirrorEvent, PlayerSnapshot};
pub use fetcher::{LyricsFetcher, PrefetchOutcome};
pub use mirror::{MusicPlayer, MusicPlayerBuilder, PlayOutcome, PlayerOptions, SkipDirection};
pub use paths::{
    config_dir, config_path, default_lyrics_dir, log_file_path, CONFIG_DIR_NAME,
    CONFIG_FILE_NAME, LOG_FILE_NAME, LYRICS_FILE_EXTENSION,
};
pub use playback::{
    Collection, EntryId, NativePlaybackStatus, PlayableItem, PlaybackState, PlayerQueue,
    QueueEntry, RepeatMode, ShuffleMode, Song, SongId,
};
pub use player::{
    NoSubscriptionGate, PlayerBackend, PlayerNotification, SubscriptionGate, VolumeSource,
};
pub use provider::{LyricsDocument, LyricsProvider, LyricsQuery};
pub use time::{format_playback_time, seconds_to_duration, DurationExt};
