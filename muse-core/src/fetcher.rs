//! Best-effort lyrics prefetch into the file cache.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::LyricsCache;
use crate::playback::Song;
use crate::provider::{LyricsDocument, LyricsProvider, LyricsQuery};

/// Result of one prefetch attempt. Never an error: every failure is logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefetchOutcome {
    /// A cached file already existed; no lookup was made
    Cached,
    /// A document was found and written to the cache
    Downloaded { path: PathBuf },
    /// No provider had lyrics
    NotFound,
    /// The search did not finish within the timeout
    TimedOut,
    /// The fetcher was shut down mid-search
    Cancelled,
    /// A document was found but could not be written
    Failed,
}

/// Lyrics fetcher that fills the cache from a list of providers
pub struct LyricsFetcher {
    cache: Arc<LyricsCache>,
    providers: Vec<Arc<dyn LyricsProvider>>,
    search_timeout: Duration,
    cancel_token: CancellationToken,
}

impl LyricsFetcher {
    /// Create a new lyrics fetcher
    ///
    /// # Arguments
    /// * `cache` - Lyrics cache for storing fetched lyrics
    /// * `providers` - List of lyrics providers to try in order
    /// * `search_timeout` - Upper bound for the whole provider search
    /// * `cancel_token` - Optional external cancellation token for graceful shutdown
    pub fn new(
        cache: Arc<LyricsCache>,
        providers: Vec<Arc<dyn LyricsProvider>>,
        search_timeout: Duration,
        cancel_token: Option<CancellationToken>,
    ) -> Self {
        Self {
            cache,
            providers,
            search_timeout,
            cancel_token: cancel_token.unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn cache(&self) -> &LyricsCache {
        &self.cache
    }

    /// Get a clone of the cancellation token
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Prefetch lyrics for a catalog song
    pub async fn prefetch_song(&self, song: &Song) -> PrefetchOutcome {
        self.prefetch(&LyricsQuery::for_song(song)).await
    }

    /// Make sure lyrics for the query's (title, artist) are cached.
    pub async fn prefetch(&self, query: &LyricsQuery) -> PrefetchOutcome {
        let title = &query.track_name;
        let artist = &query.artist_name;

        if self.cache.contains(title, artist).await {
            debug!("Lyrics already cached for {} - {}", artist, title);
            return PrefetchOutcome::Cached;
        }

        self.download(query).await
    }

    /// Search even when a document is cached, overwriting it only on success.
    pub async fn refresh(&self, query: &LyricsQuery) -> PrefetchOutcome {
        self.download(query).await
    }

    async fn download(&self, query: &LyricsQuery) -> PrefetchOutcome {
        let title = &query.track_name;
        let artist = &query.artist_name;

        info!("Downloading lyrics for {} - {}", artist, title);

        let found = tokio::select! {
            () = self.cancel_token.cancelled() => {
                info!("Lyrics search cancelled for {} - {}", artist, title);
                return PrefetchOutcome::Cancelled;
            }
            result = tokio::time::timeout(self.search_timeout, self.search(query)) => result,
        };

        let Ok(found) = found else {
            warn!(
                "Lyrics search for {} - {} timed out after {:?}",
                artist, title, self.search_timeout
            );
            return PrefetchOutcome::TimedOut;
        };

        let Some(document) = found else {
            info!(
                "No lyrics found for {} - {} (tried {} providers)",
                artist,
                title,
                self.providers.len()
            );
            return PrefetchOutcome::NotFound;
        };

        match self.cache.write(title, artist, &document.text).await {
            Ok(path) => {
                info!(
                    "Cached lyrics for {} - {} at {:?} (provider_id: {}, synced: {})",
                    artist, title, path, document.provider_id, document.synced
                );
                PrefetchOutcome::Downloaded { path }
            }
            Err(e) => {
                warn!("Failed to cache lyrics for {} - {}: {}", artist, title, e);
                PrefetchOutcome::Failed
            }
        }
    }

    /// First document from the first provider that returns any
    async fn search(&self, query: &LyricsQuery) -> Option<LyricsDocument> {
        for provider in &self.providers {
            debug!("Trying provider: {}", provider.name());
            match provider.search(query).await {
                Ok(documents) => {
                    if let Some(document) = documents.into_iter().next() {
                        return Some(document);
                    }
                    debug!("Provider {} returned no lyrics", provider.name());
                }
                Err(e) => {
                    warn!("Provider {} failed with error: {}", provider.name(), e);
                }
            }
        }
        None
    }
}
