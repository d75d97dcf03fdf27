use async_trait::async_trait;
use muse_core::{CoreError, LyricsDocument, LyricsProvider, LyricsQuery};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use std::fmt::Write;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const LRCLIB_API_URL: &str = "https://lrclib.net/api";

/// Default timeout for HTTP requests (10 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default number of retry attempts
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Duration tolerance for the track-name search (±2 seconds)
const DURATION_TOLERANCE_SECS: f64 = 2.0;
/// Penalty that ranks plain-only records after every synced one
const PLAIN_ONLY_PENALTY: i64 = 100;

/// Ranking cost of a duration mismatch (lower is better).
/// Unknown durations on either side cost a flat 50.
#[allow(clippy::cast_possible_truncation)]
fn duration_score(actual: Option<f64>, expected: Option<u32>, scale: f64) -> i64 {
    match (actual, expected) {
        (Some(d), Some(q)) => {
            let diff = (d - f64::from(q)).abs() * scale;
            if !diff.is_finite() || diff > 1e12 {
                return i64::MAX / 2;
            }
            diff as i64
        }
        _ => 50,
    }
}

/// LRCLIB.net lyrics provider
pub struct LrclibProvider {
    client: ClientWithMiddleware,
    base_url: String,
}

impl LrclibProvider {
    /// Create a new LRCLIB provider with default 10-second timeout and 3 retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, CoreError> {
        Self::with_base_url(LRCLIB_API_URL)
    }

    /// Provider against another LRCLIB-compatible server.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, CoreError> {
        let base_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("Muse/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(DEFAULT_MAX_RETRIES);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn get_url(&self, query: &LyricsQuery) -> String {
        let mut url = format!(
            "{}/get?artist_name={}&track_name={}",
            self.base_url,
            urlencoding::encode(&query.artist_name),
            urlencoding::encode(&query.track_name)
        );
        if let Some(album) = &query.album_name {
            let _ = write!(url, "&album_name={}", urlencoding::encode(album));
        }
        if let Some(duration) = query.duration_secs {
            let _ = write!(url, "&duration={duration}");
        }
        url
    }

    fn failure(&self, reason: String) -> CoreError {
        CoreError::LyricsProviderFailed {
            provider: self.name().to_string(),
            reason,
        }
    }
}

/// One record from the LRCLIB API. Unused fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LrclibRecord {
    id: i64,
    #[serde(default)]
    artist_name: String,
    duration: Option<f64>,
    #[serde(default)]
    instrumental: bool,
    plain_lyrics: Option<String>,
    synced_lyrics: Option<String>,
}

impl LrclibRecord {
    fn synced_text(&self) -> Option<&str> {
        self.synced_lyrics
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    fn plain_text(&self) -> Option<&str> {
        self.plain_lyrics
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    fn has_lyrics(&self) -> bool {
        !self.instrumental && (self.synced_text().is_some() || self.plain_text().is_some())
    }

    /// Synced text when present, else plain text. Instrumental tracks have none.
    fn into_document(self) -> Option<LyricsDocument> {
        if self.instrumental {
            debug!("Track is instrumental (lrclib id: {})", self.id);
            return None;
        }
        let provider_id = self.id.to_string();
        if let Some(synced) = self.synced_text() {
            return Some(LyricsDocument::new(synced, provider_id, true));
        }
        self.plain_text()
            .map(|plain| LyricsDocument::new(plain, provider_id, false))
    }
}

/// Order records best-first: synced before plain, then by duration distance.
fn rank(records: Vec<LrclibRecord>, query: &LyricsQuery, scale: f64) -> Vec<LyricsDocument> {
    let mut usable: Vec<_> = records.into_iter().filter(LrclibRecord::has_lyrics).collect();
    usable.sort_by_key(|r| {
        let sync_score = if r.synced_text().is_some() {
            0
        } else {
            PLAIN_ONLY_PENALTY
        };
        sync_score + duration_score(r.duration, query.duration_secs, scale)
    });
    usable
        .into_iter()
        .filter_map(LrclibRecord::into_document)
        .collect()
}

/// Keep records within the duration tolerance of the query.
fn within_tolerance(records: Vec<LrclibRecord>, query: &LyricsQuery) -> Vec<LrclibRecord> {
    let Some(expected) = query.duration_secs else {
        return records;
    };
    let expected = f64::from(expected);
    records
        .into_iter()
        .filter(|r| {
            r.duration
                .is_some_and(|d| (d - expected).abs() <= DURATION_TOLERANCE_SECS)
        })
        .collect()
}

#[async_trait]
impl LyricsProvider for LrclibProvider {
    fn name(&self) -> &'static str {
        "lrclib"
    }

    async fn search(&self, query: &LyricsQuery) -> Result<Vec<LyricsDocument>, CoreError> {
        info!(
            "Searching LRCLIB for: {} - {} (duration: {:?}s)",
            query.artist_name, query.track_name, query.duration_secs
        );

        let url = self.get_url(query);
        debug!("LRCLIB GET (exact match): {}", url);

        let response = self.client.get(&url).send().await?;
        debug!("LRCLIB response status: {}", response.status());

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            info!("LRCLIB exact match not found, trying search by track name");
            return self.search_by_track_name(query).await;
        }

        if !response.status().is_success() {
            warn!("LRCLIB returned status: {}", response.status());
            return Err(self.failure(format!("LRCLIB returned status: {}", response.status())));
        }

        let record: LrclibRecord = response.json().await?;
        info!(
            "LRCLIB exact match id: {} (artist: {})",
            record.id, record.artist_name
        );
        Ok(record.into_document().into_iter().collect())
    }
}

impl LrclibProvider {
    async fn search_by_track_name(
        &self,
        query: &LyricsQuery,
    ) -> Result<Vec<LyricsDocument>, CoreError> {
        let url = format!(
            "{}/search?track_name={}",
            self.base_url,
            urlencoding::encode(&query.track_name)
        );
        debug!("LRCLIB GET (search by track): {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            warn!("LRCLIB track search returned status: {}", response.status());
            return self.search_free_text(query).await;
        }

        let records: Vec<LrclibRecord> = response.json().await?;
        let close = within_tolerance(records, query);
        for record in &close {
            debug!(
                "LRCLIB track search candidate id: {} (artist: {}, duration: {:?})",
                record.id, record.artist_name, record.duration
            );
        }
        let candidates = rank(close, query, 10.0);

        if candidates.is_empty() {
            info!("LRCLIB track search: nothing usable within duration tolerance, trying full search");
            return self.search_free_text(query).await;
        }

        info!(
            "LRCLIB matched by track name + duration ({} candidates, best id: {})",
            candidates.len(),
            candidates[0].provider_id
        );
        Ok(candidates)
    }

    async fn search_free_text(
        &self,
        query: &LyricsQuery,
    ) -> Result<Vec<LyricsDocument>, CoreError> {
        let text = format!("{} {}", query.artist_name, query.track_name);
        let url = format!("{}/search?q={}", self.base_url, urlencoding::encode(&text));
        debug!("LRCLIB GET (full search): {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(self.failure(format!(
                "LRCLIB search returned status: {}",
                response.status()
            )));
        }

        let records: Vec<LrclibRecord> = response.json().await?;
        let candidates = rank(records, query, 1.0);

        match candidates.first() {
            Some(best) => info!("LRCLIB matched via full search (best id: {})", best.provider_id),
            None => info!(
                "LRCLIB has no lyrics for {} - {}",
                query.artist_name, query.track_name
            ),
        }
        Ok(candidates)
    }
}
