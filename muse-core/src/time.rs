//! Time and duration conversion utilities.
//!
//! Playback positions arrive from the player as floating-point seconds. This
//! module converts them to [`Duration`] and to display strings without
//! truncating casts.

use std::time::Duration;

/// Extension trait for safe Duration conversions.
pub trait DurationExt {
    /// Convert duration to milliseconds as u64, saturating at `u64::MAX`.
    fn as_millis_u64(&self) -> u64;

    /// Convert duration to seconds as u32, saturating at `u32::MAX`.
    ///
    /// In practice, this is always safe for audio tracks because
    /// `u32::MAX` seconds is approximately 136 years.
    fn as_secs_u32(&self) -> u32;
}

impl DurationExt for Duration {
    fn as_millis_u64(&self) -> u64 {
        u64::try_from(self.as_millis()).unwrap_or(u64::MAX)
    }

    fn as_secs_u32(&self) -> u32 {
        u32::try_from(self.as_secs()).unwrap_or(u32::MAX)
    }
}

/// Convert a seconds value reported by the player to a [`Duration`].
///
/// Negative, NaN and infinite inputs yield `None`.
#[must_use]
pub fn seconds_to_duration(seconds: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(seconds).ok()
}

/// Format a seconds value as `m:ss`, or `h:mm:ss` past the hour.
///
/// Invalid inputs format as `0:00`.
#[must_use]
pub fn format_playback_time(seconds: f64) -> String {
    let total = seconds_to_duration(seconds).unwrap_or_default().as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
