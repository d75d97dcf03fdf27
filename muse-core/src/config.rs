use crate::error::{CoreError, Result};
use const_format::concatcp;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MuseConfig {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub lyrics: LyricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Playback time sampling period while playing
    #[serde(default = "default_time_observation_interval")]
    pub time_observation_interval_ms: u64,
    /// Backward skip within this many seconds of the track start goes to the
    /// previous entry; later it restarts the current track
    #[serde(default = "default_backward_restart_threshold")]
    pub backward_restart_threshold_secs: f64,
}

const fn default_time_observation_interval() -> u64 {
    1000
}

const fn default_backward_restart_threshold() -> f64 {
    1.0
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            time_observation_interval_ms: default_time_observation_interval(),
            backward_restart_threshold_secs: default_backward_restart_threshold(),
        }
    }
}

impl PlayerConfig {
    #[must_use]
    pub const fn time_observation_interval(&self) -> Duration {
        Duration::from_millis(self.time_observation_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricsConfig {
    /// Prefetch lyrics when playback starts
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Wait for the prefetch before asking the player to start
    #[serde(default)]
    pub prefetch_blocks_playback: bool,
    /// Upper bound for one lyrics search across all providers
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,
    /// Cache directory; defaults to ~/Music/Muse/Lyrics
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Provider priority: providers are tried in order
    #[serde(default = "default_providers")]
    pub providers: Vec<LyricsProviderType>,
}

const fn default_true() -> bool {
    true
}

const fn default_search_timeout() -> u64 {
    10
}

fn default_providers() -> Vec<LyricsProviderType> {
    vec![LyricsProviderType::Lrclib]
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefetch_blocks_playback: false,
            search_timeout_secs: default_search_timeout(),
            cache_dir: None,
            providers: default_providers(),
        }
    }
}

impl LyricsConfig {
    #[must_use]
    pub const fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    /// Configured cache directory or the default one
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(crate::paths::default_lyrics_dir)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LyricsProviderType {
    Lrclib,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to ~/.config/muse/muse.log
    #[serde(default)]
    pub file: bool,
}

impl MuseConfig {
    /// Get the configuration directory path (~/.config/muse/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/muse/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from file or create template on first run
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template, or an
    /// error if the file cannot be read, parsed or validated.
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            Self::write_template(&config_path)?;
            return Err(CoreError::ConfigNotFound { path: config_path });
        }

        let content = fs::read_to_string(&config_path)?;
        Self::parse(&content)
    }

    /// Load the config file, falling back to defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read, parsed or validated.
    pub fn load_or_default() -> Result<Self> {
        match Self::load_or_create() {
            Err(CoreError::ConfigNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Write the commented template, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn write_template(path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, CONFIG_TEMPLATE)?;
        Ok(())
    }

    /// Parse and validate config text
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value is out of range.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.player.time_observation_interval_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "player.time_observation_interval_ms must be greater than 0".into(),
            });
        }
        let threshold = self.player.backward_restart_threshold_secs;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(CoreError::ConfigInvalid {
                message: "player.backward_restart_threshold_secs must be a non-negative number"
                    .into(),
            });
        }
        if self.lyrics.search_timeout_secs == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "lyrics.search_timeout_secs must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

pub const CONFIG_TEMPLATE: &str = concatcp!(
    r#"# Muse Configuration
# ~/.config/"#,
    crate::paths::CONFIG_DIR_NAME,
    "/",
    crate::paths::CONFIG_FILE_NAME,
    r#"

[player]
# How often the playback position is sampled while playing
time_observation_interval_ms = 1000
# Skipping backward within this many seconds of the start goes to the
# previous track; later it restarts the current track
backward_restart_threshold_secs = 1.0

[lyrics]
enabled = true
# Wait for lyrics to download before playback starts
prefetch_blocks_playback = false
search_timeout_secs = 10
# Defaults to ~/Music/Muse/Lyrics
# cache_dir = ""
# Provider priority: providers are tried in order; first result wins
providers = ["lrclib"]

[logging]
# Also write logs to ~/.config/muse/muse.log
file = false
"#
);
