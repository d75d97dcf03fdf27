use serde::{Deserialize, Serialize};

/// Playback status as reported by the external player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativePlaybackStatus {
    Playing,
    Paused,
    Stopped,
    Interrupted,
    SeekingForward,
    SeekingBackward,
}

/// Playback state published by the mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Playing,
    Loading,
    Paused,
    #[default]
    Stopped,
}

impl From<NativePlaybackStatus> for PlaybackState {
    /// Statuses without a counterpart (interruptions, seeking) map to `Stopped`.
    fn from(status: NativePlaybackStatus) -> Self {
        match status {
            NativePlaybackStatus::Playing => Self::Playing,
            NativePlaybackStatus::Paused => Self::Paused,
            NativePlaybackStatus::Stopped
            | NativePlaybackStatus::Interrupted
            | NativePlaybackStatus::SeekingForward
            | NativePlaybackStatus::SeekingBackward => Self::Stopped,
        }
    }
}

impl PlaybackState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Playing => "playing",
            Self::Loading => "loading",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShuffleMode {
    #[default]
    Off,
    Songs,
}

impl ShuffleMode {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Off => Self::Songs,
            Self::Songs => Self::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    #[default]
    None,
    All,
    One,
}

impl RepeatMode {
    /// Next mode in the repeat button cycle: none, all, one.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::None => Self::All,
            Self::All => Self::One,
            Self::One => Self::None,
        }
    }
}

/// Catalog identity of a song.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SongId(pub String);

impl SongId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for SongId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A song as described by the catalog.
///
/// Songs are owned by the player framework; the mirror only holds clones.
/// Two songs are the same song when their [`SongId`]s match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub artist_name: String,
    /// Duration in seconds, when the catalog knows it
    pub duration: Option<f64>,
    pub artwork_url: Option<String>,
}

impl Song {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist_name: impl Into<String>,
    ) -> Self {
        Self {
            id: SongId::new(id),
            title: title.into(),
            artist_name: artist_name.into(),
            duration: None,
            artwork_url: None,
        }
    }

    #[must_use]
    pub const fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    #[must_use]
    pub fn is_same_song(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// A non-song catalog item that can still be queued (album, playlist, station).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub title: String,
}

impl Collection {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Anything the player can be asked to play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PlayableItem {
    Song(Song),
    Album(Collection),
    Playlist(Collection),
    Station(Collection),
}

impl PlayableItem {
    #[must_use]
    pub const fn as_song(&self) -> Option<&Song> {
        match self {
            Self::Song(song) => Some(song),
            _ => None,
        }
    }
}

impl From<Song> for PlayableItem {
    fn from(song: Song) -> Self {
        Self::Song(song)
    }
}

/// Player-assigned identity of a queue slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub u64);

/// One slot in the external player's queue.
///
/// `item` is `None` while the player is still resolving the slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: EntryId,
    pub item: Option<PlayableItem>,
}

impl QueueEntry {
    #[must_use]
    pub const fn new(id: EntryId, item: Option<PlayableItem>) -> Self {
        Self { id, item }
    }

    #[must_use]
    pub fn song(&self) -> Option<&Song> {
        self.item.as_ref().and_then(PlayableItem::as_song)
    }

    #[must_use]
    pub fn holds_song(&self, song: &Song) -> bool {
        self.song().is_some_and(|s| s.is_same_song(song))
    }
}

/// A replacement queue handed to the player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerQueue {
    /// Fresh items; the player assigns entry ids
    Items {
        items: Vec<PlayableItem>,
        start_index: usize,
    },
    /// Existing entries reordered to begin at `start_index`
    Entries {
        entries: Vec<QueueEntry>,
        start_index: usize,
    },
}

impl PlayerQueue {
    #[must_use]
    pub fn from_item(item: PlayableItem) -> Self {
        Self::Items {
            items: vec![item],
            start_index: 0,
        }
    }

    #[must_use]
    pub fn from_songs(songs: Vec<Song>) -> Self {
        Self::Items {
            items: songs.into_iter().map(PlayableItem::Song).collect(),
            start_index: 0,
        }
    }

    /// Existing entries starting at the first entry holding `song`.
    ///
    /// Returns `None` when no entry holds the song.
    #[must_use]
    pub fn starting_at(entries: Vec<QueueEntry>, song: &Song) -> Option<Self> {
        let start_index = entries.iter().position(|entry| entry.holds_song(song))?;
        Some(Self::Entries {
            entries,
            start_index,
        })
    }

    /// The item playback would begin with.
    #[must_use]
    pub fn lead_item(&self) -> Option<&PlayableItem> {
        match self {
            Self::Items { items, start_index } => items.get(*start_index),
            Self::Entries {
                entries,
                start_index,
            } => entries.get(*start_index).and_then(|e| e.item.as_ref()),
        }
    }
}
