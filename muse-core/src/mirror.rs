//! The playback-state mirror.
//!
//! [`MusicPlayer`] reflects an externally-owned player into published fields,
//! forwards user commands to it, samples the playback position while playing,
//! resolves output devices by name, and prefetches lyrics for whatever starts
//! playing. The external player is always authoritative: every notification
//! resynchronizes the mirror from the player's own status.

use crate::config::MuseConfig;
use crate::device::{AudioDeviceDirectory, AudioDeviceId, DeviceNameMap};
use crate::error::{CoreError, Result};
use crate::event::{MirrorEvent, PlayerSnapshot};
use crate::fetcher::LyricsFetcher;
use crate::playback::{PlayableItem, PlaybackState, PlayerQueue, RepeatMode, ShuffleMode, Song};
use crate::player::{
    NoSubscriptionGate, PlayerBackend, PlayerNotification, SubscriptionGate, VolumeSource,
};
use crate::time::{format_playback_time, DurationExt};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipDirection {
    Forward,
    Backward,
}

/// How a play request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The player was asked to start. Playback state is `Playing`.
    Started,
    /// The subscription gate redirected to its offer; nothing was played
    UpsellOffered,
    /// A newer request (or `stop`) replaced this one before it finished
    Superseded,
    /// The requested song is not in the queue
    NotInQueue,
}

/// Tunables for the mirror, usually taken from [`MuseConfig`]
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerOptions {
    pub time_observation_interval: Duration,
    pub backward_restart_threshold_secs: f64,
    /// Prefetch lyrics for the lead song of every play request
    pub lyrics_enabled: bool,
    pub prefetch_blocks_playback: bool,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self::from_config(&MuseConfig::default())
    }
}

impl PlayerOptions {
    #[must_use]
    pub const fn from_config(config: &MuseConfig) -> Self {
        Self {
            time_observation_interval: config.player.time_observation_interval(),
            backward_restart_threshold_secs: config.player.backward_restart_threshold_secs,
            lyrics_enabled: config.lyrics.enabled,
            prefetch_blocks_playback: config.lyrics.prefetch_blocks_playback,
        }
    }
}

struct PlayRequest {
    id: u64,
    token: CancellationToken,
}

struct MirrorInner {
    snapshot: PlayerSnapshot,
    devices: DeviceNameMap,
    time_observation: Option<CancellationToken>,
    play_request: Option<PlayRequest>,
    next_play_request_id: u64,
}

/// Builder for [`MusicPlayer`]
pub struct MusicPlayerBuilder {
    backend: Arc<dyn PlayerBackend>,
    devices: Arc<dyn AudioDeviceDirectory>,
    volume_source: Option<Arc<dyn VolumeSource>>,
    gate: Arc<dyn SubscriptionGate>,
    lyrics: Option<Arc<LyricsFetcher>>,
    options: PlayerOptions,
    cancel_token: Option<CancellationToken>,
}

impl MusicPlayerBuilder {
    #[must_use]
    pub fn with_volume_source(mut self, source: Arc<dyn VolumeSource>) -> Self {
        self.volume_source = Some(source);
        self
    }

    #[must_use]
    pub fn with_subscription_gate(mut self, gate: Arc<dyn SubscriptionGate>) -> Self {
        self.gate = gate;
        self
    }

    #[must_use]
    pub fn with_lyrics_fetcher(mut self, fetcher: Arc<LyricsFetcher>) -> Self {
        self.lyrics = Some(fetcher);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: PlayerOptions) -> Self {
        self.options = options;
        self
    }

    /// External cancellation token for graceful shutdown
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<MusicPlayer> {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Arc::new_cyclic(|this| MusicPlayer {
            backend: self.backend,
            devices: self.devices,
            volume_source: self.volume_source,
            gate: self.gate,
            lyrics: self.lyrics,
            options: self.options,
            inner: RwLock::new(MirrorInner {
                snapshot: PlayerSnapshot::default(),
                devices: DeviceNameMap::default(),
                time_observation: None,
                play_request: None,
                next_play_request_id: 0,
            }),
            event_tx,
            cancel_token: self.cancel_token.unwrap_or_default(),
            this: this.clone(),
        })
    }
}

/// In-process reflection of the external player's state
pub struct MusicPlayer {
    backend: Arc<dyn PlayerBackend>,
    devices: Arc<dyn AudioDeviceDirectory>,
    volume_source: Option<Arc<dyn VolumeSource>>,
    gate: Arc<dyn SubscriptionGate>,
    lyrics: Option<Arc<LyricsFetcher>>,
    options: PlayerOptions,
    inner: RwLock<MirrorInner>,
    event_tx: broadcast::Sender<MirrorEvent>,
    cancel_token: CancellationToken,
    this: Weak<Self>,
}

impl MusicPlayer {
    /// Start building a mirror over a player and a device directory
    #[must_use]
    pub fn builder(
        backend: Arc<dyn PlayerBackend>,
        devices: Arc<dyn AudioDeviceDirectory>,
    ) -> MusicPlayerBuilder {
        MusicPlayerBuilder {
            backend,
            devices,
            volume_source: None,
            gate: Arc::new(NoSubscriptionGate),
            lyrics: None,
            options: PlayerOptions::default(),
            cancel_token: None,
        }
    }

    /// Subscribe to published-field changes
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MirrorEvent> {
        self.event_tx.subscribe()
    }

    /// Get a clone of the cancellation token
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Stop the notification bridge, the time observation and in-flight requests
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    pub async fn snapshot(&self) -> PlayerSnapshot {
        self.inner.read().await.snapshot.clone()
    }

    pub async fn playback_state(&self) -> PlaybackState {
        self.inner.read().await.snapshot.playback_state
    }

    pub async fn current_song(&self) -> Option<Song> {
        self.inner.read().await.snapshot.current_song.clone()
    }

    pub async fn queue(&self) -> Vec<Song> {
        self.inner.read().await.snapshot.queue.clone()
    }

    /// Seconds into the current song
    pub async fn playback_time(&self) -> f64 {
        self.inner.read().await.snapshot.playback_time
    }

    pub async fn shuffle_mode(&self) -> ShuffleMode {
        self.inner.read().await.snapshot.shuffle_mode
    }

    pub async fn repeat_mode(&self) -> RepeatMode {
        self.inner.read().await.snapshot.repeat_mode
    }

    pub async fn volume(&self) -> Option<f32> {
        self.inner.read().await.snapshot.volume
    }

    /// Fraction of the current song already played
    pub async fn progress(&self) -> Option<f64> {
        self.inner.read().await.snapshot.progress()
    }

    /// Whether the playback time sampler is running
    pub async fn is_observing_time(&self) -> bool {
        self.inner.read().await.time_observation.is_some()
    }

    fn emit(&self, event: MirrorEvent) {
        let _ = self.event_tx.send(event);
    }

    // ---------------------------------------------------------------------
    // Notification bridge
    // ---------------------------------------------------------------------

    /// Start mirroring in a background task.
    ///
    /// Performs a full resync first, then follows player notifications and
    /// volume changes until the cancellation token fires or the mirror is
    /// dropped.
    #[must_use]
    pub fn start(&self) -> JoinHandle<()> {
        let this = self.this.clone();
        let mut notifications = self.backend.subscribe();
        let mut volume = self.volume_source.as_ref().map(|source| source.subscribe());
        let cancel_token = self.cancel_token.clone();

        tokio::spawn(async move {
            info!("Starting playback state mirror");

            if let Some(player) = this.upgrade() {
                player.resync().await;
                if let Some(rx) = volume.as_mut() {
                    let current = *rx.borrow_and_update();
                    player.publish_volume(current).await;
                }
            }

            loop {
                tokio::select! {
                    () = cancel_token.cancelled() => {
                        info!("Playback state mirror shutting down");
                        break;
                    }
                    notification = notifications.recv() => {
                        let Some(player) = this.upgrade() else { break };
                        match notification {
                            Ok(notification) => player.handle_notification(notification).await,
                            Err(RecvError::Lagged(n)) => {
                                warn!("Missed {} player notifications, resynchronizing", n);
                                player.resync().await;
                            }
                            Err(RecvError::Closed) => {
                                info!("Player notification channel closed");
                                break;
                            }
                        }
                    }
                    Some(level) = next_volume(&mut volume) => {
                        let Some(player) = this.upgrade() else { break };
                        player.publish_volume(level).await;
                    }
                }
            }
        })
    }

    /// Apply one player notification
    pub async fn handle_notification(&self, notification: PlayerNotification) {
        match notification {
            PlayerNotification::StateChanged => self.sync_state().await,
            PlayerNotification::QueueChanged => self.sync_queue().await,
        }
    }

    /// Re-read everything from the player
    pub async fn resync(&self) {
        self.sync_state().await;
        self.sync_queue().await;
    }

    /// Re-read playback status, shuffle and repeat mode from the player
    pub async fn sync_state(&self) {
        let state = PlaybackState::from(self.backend.status());
        let shuffle_mode = self.backend.shuffle_mode().unwrap_or_default();
        let repeat_mode = self.backend.repeat_mode().unwrap_or_default();

        let mut inner = self.inner.write().await;
        self.apply_playback_state(&mut inner, state);

        if inner.snapshot.shuffle_mode != shuffle_mode {
            inner.snapshot.shuffle_mode = shuffle_mode;
            self.emit(MirrorEvent::ShuffleModeChanged { mode: shuffle_mode });
        }
        if inner.snapshot.repeat_mode != repeat_mode {
            inner.snapshot.repeat_mode = repeat_mode;
            self.emit(MirrorEvent::RepeatModeChanged { mode: repeat_mode });
        }
    }

    /// Rebuild the mirrored queue and current song from the player
    pub async fn sync_queue(&self) {
        let queue: Vec<Song> = self
            .backend
            .entries()
            .iter()
            .filter_map(|entry| entry.song().cloned())
            .collect();
        let current = self
            .backend
            .current_entry()
            .and_then(|entry| entry.song().cloned());

        let mut inner = self.inner.write().await;
        if inner.snapshot.queue != queue {
            debug!("Queue changed: {} songs", queue.len());
            inner.snapshot.queue.clone_from(&queue);
            self.emit(MirrorEvent::QueueChanged { queue });
        }
        self.apply_current_song(&mut inner, current);
    }

    async fn publish_volume(&self, volume: Option<f32>) {
        let mut inner = self.inner.write().await;
        if inner.snapshot.volume != volume {
            inner.snapshot.volume = volume;
            self.emit(MirrorEvent::VolumeChanged { volume });
        }
    }

    // ---------------------------------------------------------------------
    // Published field updates. Callers hold the write lock.
    // ---------------------------------------------------------------------

    fn apply_playback_state(&self, inner: &mut MirrorInner, state: PlaybackState) {
        let previous = inner.snapshot.playback_state;
        inner.snapshot.playback_state = state;
        if previous != state {
            debug!("Playback state {} -> {}", previous, state);
            self.emit(MirrorEvent::PlaybackStateChanged { state });
        }

        match state {
            PlaybackState::Playing => {
                if inner.time_observation.is_none() {
                    inner.time_observation = Some(self.spawn_time_observation());
                }
            }
            PlaybackState::Loading | PlaybackState::Paused => {
                Self::stop_time_observation(inner);
            }
            PlaybackState::Stopped => {
                Self::stop_time_observation(inner);
                let had_song = inner.snapshot.current_song.is_some();
                self.apply_current_song(inner, None);
                if !had_song {
                    self.apply_playback_time(inner, 0.0);
                }
            }
        }
    }

    /// A different song (by identity) resets the playback time.
    fn apply_current_song(&self, inner: &mut MirrorInner, song: Option<Song>) {
        let same_song = match (&inner.snapshot.current_song, &song) {
            (Some(current), Some(next)) => current.is_same_song(next),
            (None, None) => true,
            _ => false,
        };

        if inner.snapshot.current_song != song {
            inner.snapshot.current_song.clone_from(&song);
            self.emit(MirrorEvent::CurrentSongChanged { song });
        }
        if !same_song {
            self.apply_playback_time(inner, 0.0);
        }
    }

    #[allow(clippy::float_cmp)]
    fn apply_playback_time(&self, inner: &mut MirrorInner, seconds: f64) {
        if inner.snapshot.playback_time != seconds {
            inner.snapshot.playback_time = seconds;
            self.emit(MirrorEvent::PlaybackTimeChanged { seconds });
        }
    }

    // ---------------------------------------------------------------------
    // Time observation
    // ---------------------------------------------------------------------

    fn spawn_time_observation(&self) -> CancellationToken {
        let token = self.cancel_token.child_token();
        let loop_token = token.clone();
        let this = self.this.clone();
        let period = self
            .options
            .time_observation_interval
            .max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = loop_token.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(player) = this.upgrade() else { break };
                        player.sample_playback_time(&loop_token).await;
                    }
                }
            }
            debug!("Playback time observation stopped");
        });

        debug!(
            "Playback time observation started ({} ms period)",
            period.as_millis_u64()
        );
        token
    }

    fn stop_time_observation(inner: &mut MirrorInner) {
        if let Some(token) = inner.time_observation.take() {
            token.cancel();
        }
    }

    async fn sample_playback_time(&self, token: &CancellationToken) {
        let seconds = self.backend.playback_time();
        let mut inner = self.inner.write().await;
        // The sampler may have been torn down while waiting for the lock
        if token.is_cancelled() {
            return;
        }
        self.apply_playback_time(&mut inner, seconds);
    }

    // ---------------------------------------------------------------------
    // Playback commands
    // ---------------------------------------------------------------------

    /// Play the player's current queue.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Playback`] if preparing or starting failed. The
    /// published state is still `Playing`: it reflects the request, and the
    /// next status notification corrects it.
    pub async fn play(&self, shuffle_mode: Option<ShuffleMode>) -> Result<PlayOutcome> {
        if self.redirect_to_upsell() {
            return Ok(PlayOutcome::UpsellOffered);
        }
        let lead = self.backend.current_entry().and_then(|entry| entry.item);
        self.start_playback(lead, shuffle_mode).await
    }

    /// Replace the queue with one item and play it.
    ///
    /// # Errors
    ///
    /// See [`play`](Self::play).
    pub async fn play_item(
        &self,
        item: PlayableItem,
        shuffle_mode: Option<ShuffleMode>,
    ) -> Result<PlayOutcome> {
        if self.redirect_to_upsell() {
            return Ok(PlayOutcome::UpsellOffered);
        }
        self.backend.set_queue(PlayerQueue::from_item(item.clone()));
        self.start_playback(Some(item), shuffle_mode).await
    }

    /// Replace the queue with one song and play it.
    ///
    /// # Errors
    ///
    /// See [`play`](Self::play).
    pub async fn play_song(&self, song: Song) -> Result<PlayOutcome> {
        self.play_item(PlayableItem::Song(song), None).await
    }

    /// Replace the queue with `songs` and play from the first.
    ///
    /// # Errors
    ///
    /// See [`play`](Self::play).
    pub async fn play_songs(
        &self,
        songs: Vec<Song>,
        shuffle_mode: Option<ShuffleMode>,
    ) -> Result<PlayOutcome> {
        if self.redirect_to_upsell() {
            return Ok(PlayOutcome::UpsellOffered);
        }
        let queue = PlayerQueue::from_songs(songs);
        let lead = queue.lead_item().cloned();
        self.backend.set_queue(queue);
        self.start_playback(lead, shuffle_mode).await
    }

    fn redirect_to_upsell(&self) -> bool {
        if !self.gate.must_upsell() {
            return false;
        }
        info!("Subscription required, offering upsell instead of playing");
        self.gate.offer_upsell();
        self.emit(MirrorEvent::UpsellRequested);
        true
    }

    async fn start_playback(
        &self,
        lead: Option<PlayableItem>,
        shuffle_mode: Option<ShuffleMode>,
    ) -> Result<PlayOutcome> {
        let (request_id, request) = self.begin_play_request().await;

        tokio::select! {
            () = request.cancelled() => return Ok(PlayOutcome::Superseded),
            () = self.prefetch_lyrics(lead.as_ref()) => {}
        }

        if let Some(mode) = shuffle_mode {
            self.set_shuffle_mode(mode).await;
        }

        {
            let mut inner = self.inner.write().await;
            if request.is_cancelled() {
                return Ok(PlayOutcome::Superseded);
            }
            self.apply_playback_state(&mut inner, PlaybackState::Loading);
        }

        let result = tokio::select! {
            () = request.cancelled() => return Ok(PlayOutcome::Superseded),
            result = self.prepare_and_play() => result,
        };

        let mut inner = self.inner.write().await;
        if request.is_cancelled() {
            return Ok(PlayOutcome::Superseded);
        }
        self.apply_playback_state(&mut inner, PlaybackState::Playing);
        if inner
            .play_request
            .as_ref()
            .is_some_and(|current| current.id == request_id)
        {
            inner.play_request = None;
        }

        result.map(|()| PlayOutcome::Started)
    }

    /// Register a new play request, cancelling the one in flight.
    async fn begin_play_request(&self) -> (u64, CancellationToken) {
        let mut inner = self.inner.write().await;
        if let Some(previous) = inner.play_request.take() {
            debug!("Superseding play request {}", previous.id);
            previous.token.cancel();
        }

        let id = inner.next_play_request_id;
        inner.next_play_request_id = id.wrapping_add(1);
        let token = self.cancel_token.child_token();
        inner.play_request = Some(PlayRequest {
            id,
            token: token.clone(),
        });
        (id, token)
    }

    /// Prepare and play, attempting both even if preparing fails.
    async fn prepare_and_play(&self) -> Result<()> {
        let prepared = self.backend.prepare_to_play().await;
        if let Err(e) = &prepared {
            warn!("Player failed to prepare: {}", e);
        }

        let played = self.backend.play().await;
        if let Err(e) = &played {
            warn!("Player failed to start: {}", e);
        }

        prepared.map_err(|source| CoreError::Playback {
            operation: "prepare_to_play",
            source,
        })?;
        played.map_err(|source| CoreError::Playback {
            operation: "play",
            source,
        })
    }

    async fn prefetch_lyrics(&self, lead: Option<&PlayableItem>) {
        let Some(fetcher) = self.lyrics.as_ref().filter(|_| self.options.lyrics_enabled) else {
            return;
        };
        let Some(song) = lead.and_then(PlayableItem::as_song) else {
            debug!("Lead item is not a song, skipping lyrics prefetch");
            return;
        };

        if self.options.prefetch_blocks_playback {
            fetcher.prefetch_song(song).await;
        } else {
            let fetcher = Arc::clone(fetcher);
            let song = song.clone();
            tokio::spawn(async move {
                fetcher.prefetch_song(&song).await;
            });
        }
    }

    /// Pause playback. No-op when already paused.
    pub async fn pause(&self) {
        if self.playback_state().await == PlaybackState::Paused {
            return;
        }
        self.backend.pause();
    }

    /// Stop playback. No-op when already stopped.
    ///
    /// Also cancels an in-flight play request. The player's stopped
    /// notification clears the current song and time.
    pub async fn stop(&self) {
        {
            let mut inner = self.inner.write().await;
            if let Some(request) = inner.play_request.take() {
                debug!("Stop cancels play request {}", request.id);
                request.token.cancel();
            }
            if inner.snapshot.playback_state == PlaybackState::Stopped {
                return;
            }
        }
        self.backend.stop();
    }

    /// Move to `seconds` in the current song.
    ///
    /// The published time changes before the player is told, so observers see
    /// the new position without waiting for the next sample.
    pub async fn seek(&self, seconds: f64) {
        debug!("Seeking to {}", format_playback_time(seconds));
        {
            let mut inner = self.inner.write().await;
            self.apply_playback_time(&mut inner, seconds);
        }
        self.backend.set_playback_time(seconds);
    }

    /// Slider drag started
    pub async fn begin_scrub(&self) {
        self.pause().await;
    }

    /// Slider released at `seconds`: seek there and resume.
    ///
    /// # Errors
    ///
    /// See [`play`](Self::play).
    pub async fn end_scrub(&self, seconds: f64) -> Result<PlayOutcome> {
        self.seek(seconds).await;
        self.play(None).await
    }

    /// Skip forward to the next entry or backward to the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Playback`] if the player fails to change entry.
    pub async fn skip(&self, direction: SkipDirection) -> Result<()> {
        match direction {
            SkipDirection::Forward => self.skip_forward().await,
            SkipDirection::Backward => self.skip_backward().await,
        }
    }

    /// When the player has nowhere to go, the queue is cleared rather than
    /// left parked on the song that was already playing.
    async fn skip_forward(&self) -> Result<()> {
        let playing = self.current_song().await;

        self.backend.skip_to_next_entry().await.map_err(|source| {
            warn!("Failed to skip to next entry: {}", source);
            CoreError::Playback {
                operation: "skip_to_next_entry",
                source,
            }
        })?;

        let entries = self.backend.entries();
        let current = self.backend.current_entry();
        let stuck_on_last = match (&playing, entries.last(), &current) {
            (Some(playing), Some(last), Some(current)) => {
                last.id == current.id && last.holds_song(playing)
            }
            _ => false,
        };

        if stuck_on_last {
            info!("No entry after the last song, clearing queue");
            self.backend.set_entries(Vec::new());
        }
        Ok(())
    }

    async fn skip_backward(&self) -> Result<()> {
        let elapsed = self.backend.playback_time();

        if (0.0..=self.options.backward_restart_threshold_secs).contains(&elapsed) {
            return self
                .backend
                .skip_to_previous_entry()
                .await
                .map_err(|source| {
                    warn!("Failed to skip to previous entry: {}", source);
                    CoreError::Playback {
                        operation: "skip_to_previous_entry",
                        source,
                    }
                });
        }

        {
            let mut inner = self.inner.write().await;
            self.apply_playback_time(&mut inner, 0.0);
        }
        self.backend.set_playback_time(0.0);
        Ok(())
    }

    /// Restart the queue at `song` and play.
    ///
    /// Returns [`PlayOutcome::NotInQueue`] without touching anything when the
    /// song is not in the mirrored queue.
    ///
    /// # Errors
    ///
    /// See [`play`](Self::play).
    pub async fn skip_to(&self, song: &Song) -> Result<PlayOutcome> {
        let queued = self
            .inner
            .read()
            .await
            .snapshot
            .queue
            .iter()
            .any(|queued| queued.is_same_song(song));
        if !queued {
            debug!("{} is not queued, ignoring skip", song.id);
            return Ok(PlayOutcome::NotInQueue);
        }

        if self.redirect_to_upsell() {
            return Ok(PlayOutcome::UpsellOffered);
        }

        let Some(queue) = PlayerQueue::starting_at(self.backend.entries(), song) else {
            warn!("{} left the player queue before the mirror caught up", song.id);
            return Ok(PlayOutcome::NotInQueue);
        };
        let lead = queue.lead_item().cloned();
        self.backend.set_queue(queue);
        self.start_playback(lead, None).await
    }

    /// Remove every queue entry holding `song`. Returns how many were removed.
    pub fn remove(&self, song: &Song) -> usize {
        let mut entries = self.backend.entries();
        let before = entries.len();
        entries.retain(|entry| !entry.holds_song(song));

        let removed = before - entries.len();
        if removed > 0 {
            debug!("Removing {} entries of {}", removed, song.id);
            self.backend.set_entries(entries);
        }
        removed
    }

    // ---------------------------------------------------------------------
    // Modes and volume
    // ---------------------------------------------------------------------

    pub async fn set_shuffle_mode(&self, mode: ShuffleMode) {
        {
            let mut inner = self.inner.write().await;
            if inner.snapshot.shuffle_mode != mode {
                inner.snapshot.shuffle_mode = mode;
                self.emit(MirrorEvent::ShuffleModeChanged { mode });
            }
        }
        self.backend.set_shuffle_mode(mode);
    }

    /// Flip shuffle on or off. Returns the new mode.
    pub async fn toggle_shuffle(&self) -> ShuffleMode {
        let mode = self.shuffle_mode().await.toggled();
        self.set_shuffle_mode(mode).await;
        mode
    }

    pub async fn set_repeat_mode(&self, mode: RepeatMode) {
        {
            let mut inner = self.inner.write().await;
            if inner.snapshot.repeat_mode != mode {
                inner.snapshot.repeat_mode = mode;
                self.emit(MirrorEvent::RepeatModeChanged { mode });
            }
        }
        self.backend.set_repeat_mode(mode);
    }

    /// Advance the repeat mode (none, all, one). Returns the new mode.
    pub async fn cycle_repeat_mode(&self) -> RepeatMode {
        let mode = self.repeat_mode().await.next();
        self.set_repeat_mode(mode).await;
        mode
    }

    /// Set the output volume from a user control.
    ///
    /// The value is clamped to `0.0..=1.0`, published, and written back to the
    /// volume source. NaN is ignored.
    pub async fn set_volume(&self, volume: f32) {
        if volume.is_nan() {
            warn!("Ignoring NaN volume");
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.publish_volume(Some(volume)).await;
        if let Some(source) = &self.volume_source {
            source.set_volume(volume);
        }
    }

    // ---------------------------------------------------------------------
    // Output devices
    // ---------------------------------------------------------------------

    /// Names of all output devices; rebuilds the name-to-device map.
    ///
    /// Enumeration failures are logged and yield an empty list, leaving the
    /// previous map in place.
    pub async fn audio_output_devices(&self) -> Vec<String> {
        let map = match DeviceNameMap::enumerate(self.devices.as_ref()) {
            Ok(map) => map,
            Err(e) => {
                warn!("Error in getting device list: {}", e);
                return Vec::new();
            }
        };
        let names = map.names().to_vec();

        let mut inner = self.inner.write().await;
        inner.devices = map;
        if inner.snapshot.output_devices != names {
            inner.snapshot.output_devices.clone_from(&names);
            self.emit(MirrorEvent::OutputDevicesChanged {
                names: names.clone(),
            });
        }
        names
    }

    /// Device for a name from the last enumeration
    pub async fn device_id(&self, name: &str) -> Option<AudioDeviceId> {
        self.inner.read().await.devices.get(name)
    }

    /// Make `device` the system default output. Failures are logged.
    pub fn set_audio_output_device(&self, device: AudioDeviceId) -> bool {
        match self.devices.set_default_output_device(device) {
            Ok(()) => {
                info!("Default output device set to {}", device);
                true
            }
            Err(e) => {
                warn!("Error in setting output device: {}", e);
                false
            }
        }
    }

    /// Select an output device by the name shown to the user
    pub async fn select_audio_output_device(&self, name: &str) -> bool {
        let Some(device) = self.device_id(name).await else {
            warn!("Failed to get device ID for {}", name);
            return false;
        };
        self.set_audio_output_device(device)
    }
}

/// Next volume level, or `None` once the source has gone away.
async fn next_volume(source: &mut Option<watch::Receiver<Option<f32>>>) -> Option<Option<f32>> {
    let rx = source.as_mut()?;
    match rx.changed().await {
        Ok(()) => Some(*rx.borrow_and_update()),
        Err(_) => {
            *source = None;
            None
        }
    }
}
