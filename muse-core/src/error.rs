use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created - edit it if needed and restart.")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Playback errors
    #[error("Player backend failed during {operation}: {source}")]
    Playback {
        operation: &'static str,
        #[source]
        source: BackendError,
    },

    // Lyrics errors
    #[error("Lyrics not found for track: {track} by {artist}")]
    LyricsNotFound { track: String, artist: String },

    #[error("Lyrics provider {provider} failed: {reason}")]
    LyricsProviderFailed { provider: String, reason: String },

    #[error("Lyrics search timed out after {timeout_secs}s")]
    LyricsTimeout { timeout_secs: u64 },

    #[error("Lyrics cache path {path} exists but is not a directory")]
    CacheNotADirectory { path: PathBuf },

    // Network errors
    #[error("Network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Network middleware failed: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failure reported by an external player implementation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure reported by the system audio device directory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("failed to enumerate audio devices (status {status})")]
    Enumeration { status: i32 },

    #[error("failed to read property {property} of device {device} (status {status})")]
    Property {
        device: u32,
        property: &'static str,
        status: i32,
    },

    #[error("failed to set default output device {device} (status {status})")]
    SetDefaultOutput { device: u32, status: i32 },
}

pub type Result<T> = std::result::Result<T, CoreError>;
