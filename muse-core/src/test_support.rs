//! In-memory collaborators for unit tests.

use crate::device::{AudioDeviceDirectory, AudioDeviceId};
use crate::error::{BackendError, CoreError, DeviceError};
use crate::playback::{
    EntryId, NativePlaybackStatus, PlayableItem, PlayerQueue, QueueEntry, RepeatMode, ShuffleMode,
    Song,
};
use crate::player::{PlayerBackend, PlayerNotification, SubscriptionGate, VolumeSource};
use crate::provider::{LyricsDocument, LyricsProvider, LyricsQuery};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

pub fn song(id: &str) -> Song {
    Song::new(id, format!("Song {id}"), "Artist").with_duration(200.0)
}

#[derive(Debug)]
struct FakePlayerState {
    status: NativePlaybackStatus,
    shuffle_mode: Option<ShuffleMode>,
    repeat_mode: Option<RepeatMode>,
    entries: Vec<QueueEntry>,
    current: Option<usize>,
    time: f64,
    next_entry_id: u64,
    prepare_delay: Option<Duration>,
    fail_prepare: bool,
    fail_play: bool,
    calls: Vec<String>,
}

/// Scriptable player that applies commands immediately and notifies subscribers.
#[derive(Debug)]
pub struct FakePlayer {
    state: Mutex<FakePlayerState>,
    notify_tx: broadcast::Sender<PlayerNotification>,
}

impl Default for FakePlayer {
    fn default() -> Self {
        let (notify_tx, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(FakePlayerState {
                status: NativePlaybackStatus::Stopped,
                shuffle_mode: Some(ShuffleMode::Off),
                repeat_mode: Some(RepeatMode::None),
                entries: Vec::new(),
                current: None,
                time: 0.0,
                next_entry_id: 1,
                prepare_delay: None,
                fail_prepare: false,
                fail_play: false,
                calls: Vec::new(),
            }),
            notify_tx,
        }
    }
}

impl FakePlayer {
    fn with_state<R>(&self, f: impl FnOnce(&mut FakePlayerState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    fn notify(&self, notification: PlayerNotification) {
        let _ = self.notify_tx.send(notification);
    }

    fn record(&self, call: &str) {
        self.with_state(|s| s.calls.push(call.to_string()));
    }

    /// Load songs directly, as if another app had queued them.
    pub fn load_songs(&self, songs: &[Song], current: usize) {
        self.with_state(|s| {
            s.entries = songs
                .iter()
                .map(|song| {
                    let id = EntryId(s.next_entry_id);
                    s.next_entry_id += 1;
                    QueueEntry::new(id, Some(PlayableItem::Song(song.clone())))
                })
                .collect();
            s.current = (!s.entries.is_empty()).then_some(current);
        });
        self.notify(PlayerNotification::QueueChanged);
    }

    pub fn push_entry(&self, item: Option<PlayableItem>) {
        self.with_state(|s| {
            let id = EntryId(s.next_entry_id);
            s.next_entry_id += 1;
            s.entries.push(QueueEntry::new(id, item));
        });
        self.notify(PlayerNotification::QueueChanged);
    }

    pub fn set_status(&self, status: NativePlaybackStatus) {
        self.with_state(|s| s.status = status);
        self.notify(PlayerNotification::StateChanged);
    }

    pub fn set_reported_modes(&self, shuffle: Option<ShuffleMode>, repeat: Option<RepeatMode>) {
        self.with_state(|s| {
            s.shuffle_mode = shuffle;
            s.repeat_mode = repeat;
        });
        self.notify(PlayerNotification::StateChanged);
    }

    pub fn advance_time(&self, seconds: f64) {
        self.with_state(|s| s.time = seconds);
    }

    pub fn set_prepare_delay(&self, delay: Option<Duration>) {
        self.with_state(|s| s.prepare_delay = delay);
    }

    pub fn fail_prepare_and_play(&self) {
        self.with_state(|s| {
            s.fail_prepare = true;
            s.fail_play = true;
        });
    }

    pub fn calls(&self) -> Vec<String> {
        self.with_state(|s| s.calls.clone())
    }

    pub fn call_count(&self, call: &str) -> usize {
        self.with_state(|s| s.calls.iter().filter(|c| c.as_str() == call).count())
    }

    pub fn current_song(&self) -> Option<Song> {
        self.current_entry().and_then(|e| e.song().cloned())
    }

    pub fn songs(&self) -> Vec<Song> {
        self.entries()
            .iter()
            .filter_map(|e| e.song().cloned())
            .collect()
    }

    pub fn time(&self) -> f64 {
        self.with_state(|s| s.time)
    }
}

#[async_trait]
impl PlayerBackend for FakePlayer {
    fn status(&self) -> NativePlaybackStatus {
        self.with_state(|s| s.status)
    }

    fn shuffle_mode(&self) -> Option<ShuffleMode> {
        self.with_state(|s| s.shuffle_mode)
    }

    fn set_shuffle_mode(&self, mode: ShuffleMode) {
        self.with_state(|s| {
            s.shuffle_mode = Some(mode);
            s.calls.push(format!("set_shuffle_mode:{mode:?}"));
        });
    }

    fn repeat_mode(&self) -> Option<RepeatMode> {
        self.with_state(|s| s.repeat_mode)
    }

    fn set_repeat_mode(&self, mode: RepeatMode) {
        self.with_state(|s| {
            s.repeat_mode = Some(mode);
            s.calls.push(format!("set_repeat_mode:{mode:?}"));
        });
    }

    fn entries(&self) -> Vec<QueueEntry> {
        self.with_state(|s| s.entries.clone())
    }

    fn current_entry(&self) -> Option<QueueEntry> {
        self.with_state(|s| s.current.and_then(|i| s.entries.get(i).cloned()))
    }

    fn set_queue(&self, queue: PlayerQueue) {
        self.with_state(|s| {
            let (entries, start_index) = match queue {
                PlayerQueue::Items { items, start_index } => {
                    let entries = items
                        .into_iter()
                        .map(|item| {
                            let id = EntryId(s.next_entry_id);
                            s.next_entry_id += 1;
                            QueueEntry::new(id, Some(item))
                        })
                        .collect::<Vec<_>>();
                    (entries, start_index)
                }
                PlayerQueue::Entries {
                    entries,
                    start_index,
                } => (entries, start_index),
            };
            s.current = (start_index < entries.len()).then_some(start_index);
            s.entries = entries;
            s.time = 0.0;
            s.calls.push("set_queue".to_string());
        });
        self.notify(PlayerNotification::QueueChanged);
    }

    fn set_entries(&self, entries: Vec<QueueEntry>) {
        self.with_state(|s| {
            let current_id = s.current.and_then(|i| s.entries.get(i)).map(|e| e.id);
            s.current = current_id.and_then(|id| entries.iter().position(|e| e.id == id));
            s.entries = entries;
            s.calls.push("set_entries".to_string());
        });
        self.notify(PlayerNotification::QueueChanged);
    }

    fn playback_time(&self) -> f64 {
        self.with_state(|s| s.time)
    }

    fn set_playback_time(&self, seconds: f64) {
        self.with_state(|s| {
            s.time = seconds;
            s.calls.push(format!("set_playback_time:{seconds}"));
        });
    }

    async fn prepare_to_play(&self) -> Result<(), BackendError> {
        let (delay, fail) = self.with_state(|s| {
            s.calls.push("prepare_to_play".to_string());
            (s.prepare_delay, s.fail_prepare)
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(BackendError::new("prepare failed"));
        }
        Ok(())
    }

    async fn play(&self) -> Result<(), BackendError> {
        let fail = self.with_state(|s| {
            s.calls.push("play".to_string());
            s.fail_play
        });
        if fail {
            return Err(BackendError::new("play failed"));
        }
        self.with_state(|s| s.status = NativePlaybackStatus::Playing);
        self.notify(PlayerNotification::StateChanged);
        Ok(())
    }

    fn pause(&self) {
        self.record("pause");
        self.with_state(|s| s.status = NativePlaybackStatus::Paused);
        self.notify(PlayerNotification::StateChanged);
    }

    fn stop(&self) {
        self.record("stop");
        self.with_state(|s| s.status = NativePlaybackStatus::Stopped);
        self.notify(PlayerNotification::StateChanged);
    }

    async fn skip_to_next_entry(&self) -> Result<(), BackendError> {
        self.with_state(|s| {
            s.calls.push("skip_to_next_entry".to_string());
            if let Some(i) = s.current {
                if i + 1 < s.entries.len() {
                    s.current = Some(i + 1);
                    s.time = 0.0;
                }
            }
        });
        self.notify(PlayerNotification::QueueChanged);
        Ok(())
    }

    async fn skip_to_previous_entry(&self) -> Result<(), BackendError> {
        self.with_state(|s| {
            s.calls.push("skip_to_previous_entry".to_string());
            if let Some(i) = s.current {
                s.current = Some(i.saturating_sub(1));
                s.time = 0.0;
            }
        });
        self.notify(PlayerNotification::QueueChanged);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<PlayerNotification> {
        self.notify_tx.subscribe()
    }
}

/// Volume source backed by a watch channel; records write-backs.
#[derive(Debug)]
pub struct FakeVolume {
    tx: watch::Sender<Option<f32>>,
    writes: Mutex<Vec<f32>>,
}

impl FakeVolume {
    pub fn new(initial: Option<f32>) -> Self {
        let (tx, _) = watch::channel(initial);
        Self {
            tx,
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Simulate the system changing the volume.
    pub fn emit(&self, volume: Option<f32>) {
        self.tx.send_replace(volume);
    }

    pub fn writes(&self) -> Vec<f32> {
        self.writes.lock().unwrap().clone()
    }
}

impl VolumeSource for FakeVolume {
    fn subscribe(&self) -> watch::Receiver<Option<f32>> {
        self.tx.subscribe()
    }

    fn set_volume(&self, volume: f32) {
        self.writes.lock().unwrap().push(volume);
        self.tx.send_replace(Some(volume));
    }
}

#[derive(Debug, Default)]
pub struct FakeGate {
    upsell: AtomicBool,
    offers: AtomicUsize,
}

impl FakeGate {
    pub fn requiring_upsell() -> Self {
        Self {
            upsell: AtomicBool::new(true),
            offers: AtomicUsize::new(0),
        }
    }

    pub fn offers(&self) -> usize {
        self.offers.load(Ordering::SeqCst)
    }
}

impl SubscriptionGate for FakeGate {
    fn must_upsell(&self) -> bool {
        self.upsell.load(Ordering::SeqCst)
    }

    fn offer_upsell(&self) {
        self.offers.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct FakeDevice {
    id: u32,
    name: Option<String>,
    output: bool,
}

impl FakeDevice {
    pub fn output(id: u32, name: &str) -> Self {
        Self {
            id,
            name: Some(name.to_string()),
            output: true,
        }
    }

    pub fn input(id: u32, name: &str) -> Self {
        Self {
            id,
            name: Some(name.to_string()),
            output: false,
        }
    }

    pub const fn unnamed_output(id: u32) -> Self {
        Self {
            id,
            name: None,
            output: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeDeviceDirectory {
    devices: Mutex<Vec<FakeDevice>>,
    fail_enumeration: bool,
    fail_set: bool,
    selected: Mutex<Vec<AudioDeviceId>>,
}

impl FakeDeviceDirectory {
    pub fn new(devices: Vec<FakeDevice>) -> Self {
        Self {
            devices: Mutex::new(devices),
            ..Self::default()
        }
    }

    pub fn failing_enumeration() -> Self {
        Self {
            fail_enumeration: true,
            ..Self::default()
        }
    }

    pub fn failing_selection(devices: Vec<FakeDevice>) -> Self {
        Self {
            devices: Mutex::new(devices),
            fail_set: true,
            ..Self::default()
        }
    }

    pub fn replace_devices(&self, devices: Vec<FakeDevice>) {
        *self.devices.lock().unwrap() = devices;
    }

    pub fn selected(&self) -> Vec<AudioDeviceId> {
        self.selected.lock().unwrap().clone()
    }

    fn find(&self, device: AudioDeviceId) -> Option<FakeDevice> {
        self.devices
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id == device.0)
            .cloned()
    }
}

impl AudioDeviceDirectory for FakeDeviceDirectory {
    fn device_ids(&self) -> Result<Vec<AudioDeviceId>, DeviceError> {
        if self.fail_enumeration {
            return Err(DeviceError::Enumeration { status: -1 });
        }
        Ok(self
            .devices
            .lock()
            .unwrap()
            .iter()
            .map(|d| AudioDeviceId(d.id))
            .collect())
    }

    fn has_output_streams(&self, device: AudioDeviceId) -> Result<bool, DeviceError> {
        Ok(self.find(device).is_some_and(|d| d.output))
    }

    fn device_name(&self, device: AudioDeviceId) -> Result<String, DeviceError> {
        self.find(device)
            .and_then(|d| d.name)
            .ok_or(DeviceError::Property {
                device: device.0,
                property: "name",
                status: -1,
            })
    }

    fn set_default_output_device(&self, device: AudioDeviceId) -> Result<(), DeviceError> {
        if self.fail_set {
            return Err(DeviceError::SetDefaultOutput {
                device: device.0,
                status: -1,
            });
        }
        self.selected.lock().unwrap().push(device);
        Ok(())
    }
}

/// Lyrics provider returning canned documents.
#[derive(Debug, Default)]
pub struct FakeLyricsProvider {
    documents: Vec<LyricsDocument>,
    delay: Option<Duration>,
    fail: bool,
    searches: AtomicUsize,
}

impl FakeLyricsProvider {
    pub fn with_text(text: &str) -> Self {
        Self {
            documents: vec![LyricsDocument::new(text, "fake-1", true)],
            ..Self::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LyricsProvider for FakeLyricsProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn search(&self, query: &LyricsQuery) -> Result<Vec<LyricsDocument>, CoreError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(CoreError::LyricsProviderFailed {
                provider: self.name().to_string(),
                reason: format!("no route for {}", query.track_name),
            });
        }
        Ok(self.documents.clone())
    }
}
