use crate::playback::{PlaybackState, RepeatMode, ShuffleMode, Song};

/// Events emitted by the mirror whenever a published field changes
#[derive(Debug, Clone, PartialEq)]
pub enum MirrorEvent {
    PlaybackStateChanged {
        state: PlaybackState,
    },
    /// The current song changed (`None` once playback stops)
    CurrentSongChanged {
        song: Option<Song>,
    },
    QueueChanged {
        queue: Vec<Song>,
    },
    /// Playback position in seconds, from sampling, seeking or a reset
    PlaybackTimeChanged {
        seconds: f64,
    },
    ShuffleModeChanged {
        mode: ShuffleMode,
    },
    RepeatModeChanged {
        mode: RepeatMode,
    },
    VolumeChanged {
        volume: Option<f32>,
    },
    /// Output devices were enumerated again
    OutputDevicesChanged {
        names: Vec<String>,
    },
    /// Playback was refused and the subscription offer was shown instead
    UpsellRequested,
}

/// Every published field of the mirror at one instant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerSnapshot {
    pub current_song: Option<Song>,
    pub queue: Vec<Song>,
    /// Seconds into the current song
    pub playback_time: f64,
    pub playback_state: PlaybackState,
    pub shuffle_mode: ShuffleMode,
    pub repeat_mode: RepeatMode,
    /// `None` when the output has no adjustable volume
    pub volume: Option<f32>,
    /// Names from the last output device enumeration
    pub output_devices: Vec<String>,
}

impl PlayerSnapshot {
    /// Fraction of the current song already played, in `0.0..=1.0`.
    ///
    /// `None` without a current song or when its duration is unknown or zero.
    #[must_use]
    pub fn progress(&self) -> Option<f64> {
        let duration = self.current_song.as_ref()?.duration?;
        if !duration.is_finite() || duration <= 0.0 {
            return None;
        }
        Some((self.playback_time / duration).clamp(0.0, 1.0))
    }
}
