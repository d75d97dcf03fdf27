//! File-per-song lyrics cache.
//!
//! Each document lives at `<dir>/<title> - <artist>.lrcx`. Files are replaced
//! wholesale on every write; nothing is ever evicted.

use crate::error::{CoreError, Result};
use crate::paths::LYRICS_FILE_EXTENSION;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A cached lyric document on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedLyricsFile {
    /// File name including extension
    pub file_name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Lyrics cache rooted at a directory
#[derive(Debug, Clone)]
pub struct LyricsCache {
    dir: PathBuf,
}

impl LyricsCache {
    /// Create a cache rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache at the default location (`~/Music/Muse/Lyrics`)
    #[must_use]
    pub fn at_default_location() -> Self {
        Self::new(crate::paths::default_lyrics_dir())
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a (title, artist) key.
    ///
    /// Path separators inside either component are replaced with `_` so the
    /// key always names a file directly inside the cache directory.
    #[must_use]
    pub fn file_name(title: &str, artist: &str) -> String {
        let sanitize = |s: &str| s.replace(['/', '\\'], "_");
        format!(
            "{} - {}.{LYRICS_FILE_EXTENSION}",
            sanitize(title),
            sanitize(artist)
        )
    }

    #[must_use]
    pub fn path_for(&self, title: &str, artist: &str) -> PathBuf {
        self.dir.join(Self::file_name(title, artist))
    }

    /// Whether a regular file is cached for the key
    pub async fn contains(&self, title: &str, artist: &str) -> bool {
        tokio::fs::metadata(self.path_for(title, artist))
            .await
            .is_ok_and(|m| m.is_file())
    }

    /// Write a document, replacing any previous one.
    ///
    /// The text is written to a temporary sibling first and renamed into
    /// place, so readers never observe a partial file.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache path exists but is not a directory, or if
    /// the directory or file cannot be written.
    pub async fn write(&self, title: &str, artist: &str, text: &str) -> Result<PathBuf> {
        match tokio::fs::metadata(&self.dir).await {
            Ok(meta) if !meta.is_dir() => {
                return Err(CoreError::CacheNotADirectory {
                    path: self.dir.clone(),
                });
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Creating lyrics cache directory at {:?}", self.dir);
                tokio::fs::create_dir_all(&self.dir).await?;
            }
            Err(e) => return Err(e.into()),
        }

        let file_name = Self::file_name(title, artist);
        let path = self.dir.join(&file_name);
        let tmp_path = self.dir.join(format!(".{file_name}.tmp"));

        tokio::fs::write(&tmp_path, text.as_bytes()).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        debug!("Wrote {} bytes of lyrics to {:?}", text.len(), path);
        Ok(path)
    }

    /// Read a cached document.
    ///
    /// A missing file and a file that is not valid UTF-8 both read as an empty
    /// string; the cause is logged.
    pub async fn read(&self, title: &str, artist: &str) -> String {
        let path = self.path_for(title, artist);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Lyrics file {:?} could not be read: {}", path, e);
                return String::new();
            }
        };

        String::from_utf8(bytes).unwrap_or_else(|e| {
            warn!("Lyrics file {:?} is not valid UTF-8: {}", path, e);
            String::new()
        })
    }

    /// Remove a cached document. Returns `false` if nothing was cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub async fn remove(&self, title: &str, artist: &str) -> Result<bool> {
        match tokio::fs::remove_file(self.path_for(title, artist)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// List cached documents sorted by file name.
    ///
    /// A cache directory that does not exist yet lists as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub async fn list(&self) -> Result<Vec<CachedLyricsFile>> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(LYRICS_FILE_EXTENSION) {
                continue;
            }
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            files.push(CachedLyricsFile {
                file_name: entry.file_name().to_string_lossy().into_owned(),
                path,
                size_bytes: meta.len(),
                modified_at: meta.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_format() {
        assert_eq!(
            LyricsCache::file_name("So What", "Miles Davis"),
            "So What - Miles Davis.lrcx"
        );
    }

    #[test]
    fn test_file_name_replaces_separators() {
        assert_eq!(
            LyricsCache::file_name("AC/DC Live", "Back\\Slash"),
            "AC_DC Live - Back_Slash.lrcx"
        );
    }

    #[test]
    fn test_path_for_is_inside_dir() {
        let cache = LyricsCache::new("/tmp/lyrics");
        assert_eq!(
            cache.path_for("Title", "Artist"),
            PathBuf::from("/tmp/lyrics/Title - Artist.lrcx")
        );
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LyricsCache::new(dir.path().join("Lyrics"));
        let text = "[00:01.00]First line\n[00:05.50]Zweite Zeile ✨\n";

        let path = cache.write("Title", "Artist", text).await.unwrap();

        assert!(path.is_file());
        assert!(cache.contains("Title", "Artist").await);
        assert_eq!(cache.read("Title", "Artist").await, text);
        assert_eq!(std::fs::read(&path).unwrap(), text.as_bytes());
    }

    #[tokio::test]
    async fn test_write_overwrites_stale_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LyricsCache::new(dir.path());

        cache.write("Title", "Artist", "old lyrics that are longer").await.unwrap();
        cache.write("Title", "Artist", "new").await.unwrap();

        assert_eq!(cache.read("Title", "Artist").await, "new");
        // No temporary files left behind
        assert_eq!(cache.list().await.unwrap().len(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_read_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LyricsCache::new(dir.path());

        assert!(!cache.contains("Nope", "Nobody").await);
        assert_eq!(cache.read("Nope", "Nobody").await, "");
    }

    #[tokio::test]
    async fn test_read_invalid_utf8_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LyricsCache::new(dir.path());
        std::fs::write(cache.path_for("Bad", "Bytes"), [0xff, 0xfe, 0x00]).unwrap();

        assert!(cache.contains("Bad", "Bytes").await);
        assert_eq!(cache.read("Bad", "Bytes").await, "");
    }

    #[tokio::test]
    async fn test_write_rejects_file_as_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("Lyrics");
        std::fs::write(&blocker, "not a directory").unwrap();
        let cache = LyricsCache::new(&blocker);

        let result = cache.write("Title", "Artist", "text").await;
        assert!(matches!(result, Err(CoreError::CacheNotADirectory { .. })));
    }

    #[tokio::test]
    async fn test_remove_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LyricsCache::new(dir.path());
        cache.write("B", "Artist", "b").await.unwrap();
        cache.write("A", "Artist", "aa").await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let files = cache.list().await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, ["A - Artist.lrcx", "B - Artist.lrcx"]);
        assert_eq!(files[0].size_bytes, 2);

        assert!(cache.remove("A", "Artist").await.unwrap());
        assert!(!cache.remove("A", "Artist").await.unwrap());
        assert_eq!(cache.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LyricsCache::new(dir.path().join("missing"));
        assert!(cache.list().await.unwrap().is_empty());
    }
}
