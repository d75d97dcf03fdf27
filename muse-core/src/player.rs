//! Seams to the platform player framework.
//!
//! The mirror never talks to a concrete media framework. A host application
//! implements these traits over its platform bindings and hands them to
//! [`MusicPlayer`](crate::MusicPlayer).

use crate::error::BackendError;
use crate::playback::{NativePlaybackStatus, PlayerQueue, QueueEntry, RepeatMode, ShuffleMode};
use async_trait::async_trait;
use tokio::sync::{broadcast, watch};

/// Change notifications emitted by the external player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerNotification {
    /// Playback status, shuffle mode or repeat mode changed
    StateChanged,
    /// Queue entries or the current entry changed
    QueueChanged,
}

/// The externally-owned player whose state the mirror reflects.
///
/// Synchronous methods must be cheap reads or fire-and-forget commands. The
/// player reports the effect of every command through [`subscribe`](Self::subscribe).
#[async_trait]
pub trait PlayerBackend: Send + Sync {
    /// Current native playback status.
    fn status(&self) -> NativePlaybackStatus;

    /// Current shuffle mode, `None` when the player does not report one.
    fn shuffle_mode(&self) -> Option<ShuffleMode>;

    fn set_shuffle_mode(&self, mode: ShuffleMode);

    /// Current repeat mode, `None` when the player does not report one.
    fn repeat_mode(&self) -> Option<RepeatMode>;

    fn set_repeat_mode(&self, mode: RepeatMode);

    /// Snapshot of all queue entries in play order.
    fn entries(&self) -> Vec<QueueEntry>;

    /// The entry currently loaded, if any.
    fn current_entry(&self) -> Option<QueueEntry>;

    /// Replace the whole queue.
    fn set_queue(&self, queue: PlayerQueue);

    /// Replace the entries of the existing queue (removal, clearing).
    fn set_entries(&self, entries: Vec<QueueEntry>);

    /// Elapsed time of the current entry in seconds.
    fn playback_time(&self) -> f64;

    fn set_playback_time(&self, seconds: f64);

    /// Prepare the current queue for playback.
    async fn prepare_to_play(&self) -> Result<(), BackendError>;

    async fn play(&self) -> Result<(), BackendError>;

    fn pause(&self);

    fn stop(&self);

    async fn skip_to_next_entry(&self) -> Result<(), BackendError>;

    async fn skip_to_previous_entry(&self) -> Result<(), BackendError>;

    /// Register for change notifications.
    fn subscribe(&self) -> broadcast::Receiver<PlayerNotification>;
}

/// System output volume, continuously updated by the platform.
pub trait VolumeSource: Send + Sync {
    /// Volume in `0.0..=1.0`, or `None` when the output has no adjustable volume.
    fn subscribe(&self) -> watch::Receiver<Option<f32>>;

    fn set_volume(&self, volume: f32);
}

/// Subscription check performed before any playback request.
pub trait SubscriptionGate: Send + Sync {
    /// Whether the user must be offered a subscription instead of playing.
    fn must_upsell(&self) -> bool;

    /// Present the subscription offer.
    fn offer_upsell(&self);
}

/// Gate for hosts without subscription requirements.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSubscriptionGate;

impl SubscriptionGate for NoSubscriptionGate {
    fn must_upsell(&self) -> bool {
        false
    }

    fn offer_upsell(&self) {}
}
