//! Path constants for configuration, logs and the lyrics cache.

use std::path::PathBuf;

/// The name of the configuration directory under ~/.config/
pub const CONFIG_DIR_NAME: &str = "muse";

/// The name of the main configuration file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// The name of the log file written when file logging is enabled
pub const LOG_FILE_NAME: &str = "muse.log";

/// Lyrics cache directory, relative to the home directory
pub const LYRICS_DIR_RELATIVE: &str = "Music/Muse/Lyrics";

/// Extension of cached lyric documents
pub const LYRICS_FILE_EXTENSION: &str = "lrcx";

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration directory path (~/.config/muse/)
#[must_use]
pub fn config_dir() -> PathBuf {
    home_dir().join(".config").join(CONFIG_DIR_NAME)
}

/// Get the config file path (~/.config/muse/config.toml)
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Get the log file path (~/.config/muse/muse.log)
#[must_use]
pub fn log_file_path() -> PathBuf {
    config_dir().join(LOG_FILE_NAME)
}

/// Get the default lyrics cache directory (~/Music/Muse/Lyrics)
#[must_use]
pub fn default_lyrics_dir() -> PathBuf {
    home_dir().join(LYRICS_DIR_RELATIVE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_is_inside_config_dir() {
        assert!(config_path().starts_with(config_dir()));
        assert!(config_path().ends_with("muse/config.toml"));
    }

    #[test]
    fn test_default_lyrics_dir_suffix() {
        assert!(default_lyrics_dir().ends_with("Music/Muse/Lyrics"));
    }
}
