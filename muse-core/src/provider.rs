use crate::error::CoreError;
use crate::playback::Song;
use crate::time::{seconds_to_duration, DurationExt};
use async_trait::async_trait;

/// Query parameters for fetching lyrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsQuery {
    /// Track name
    pub track_name: String,
    /// Artist name
    pub artist_name: String,
    /// Album name (optional)
    pub album_name: Option<String>,
    /// Track duration in seconds (for matching)
    pub duration_secs: Option<u32>,
}

impl LyricsQuery {
    /// Create a new lyrics query
    pub fn new(track_name: impl Into<String>, artist_name: impl Into<String>) -> Self {
        Self {
            track_name: track_name.into(),
            artist_name: artist_name.into(),
            album_name: None,
            duration_secs: None,
        }
    }

    /// Build a query from a catalog song
    #[must_use]
    pub fn for_song(song: &Song) -> Self {
        let query = Self::new(&song.title, &song.artist_name);
        match song.duration.and_then(seconds_to_duration) {
            Some(duration) => query.with_duration(duration.as_secs_u32()),
            None => query,
        }
    }

    /// Set album name
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album_name = Some(album.into());
        self
    }

    /// Set duration
    #[must_use]
    pub const fn with_duration(mut self, duration_secs: u32) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }
}

/// One candidate lyric document returned by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsDocument {
    /// Document text, written to the cache verbatim
    pub text: String,
    /// Provider-specific ID (e.g., LRCLIB's numeric ID as string)
    pub provider_id: String,
    /// Whether the text carries line timestamps
    pub synced: bool,
}

impl LyricsDocument {
    pub fn new(text: impl Into<String>, provider_id: impl Into<String>, synced: bool) -> Self {
        Self {
            text: text.into(),
            provider_id: provider_id.into(),
            synced,
        }
    }
}

/// Trait for lyrics providers
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Search for lyrics, best candidate first.
    ///
    /// An empty list means the provider has nothing for this query.
    async fn search(&self, query: &LyricsQuery) -> Result<Vec<LyricsDocument>, CoreError>;
}
