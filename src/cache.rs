//! Duplicate-suppression cache for liked tweets.
//!
//! The cache is a set of tweet IDs that have already been liked, consulted before
//! every like request and updated right after a successful one. The executor only
//! sees the [`LikeCache`] trait; [`FileLikeCache`] persists to a newline-delimited
//! text file and [`MemoryLikeCache`] keeps everything in memory.

use log::{debug, info};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or persisting the cache file.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to read like cache {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write like cache {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("tweet ID {0:?} cannot be stored on a single cache line")]
    InvalidId(String),
}

/// True when `tweet_id` is non-empty and holds no whitespace or control characters.
pub fn is_valid_tweet_id(tweet_id: &str) -> bool {
    !tweet_id.is_empty()
        && !tweet_id
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
}

/// A set of tweet IDs that have already been liked.
pub trait LikeCache {
    /// Pure local lookup; never performs network I/O.
    fn contains(&self, tweet_id: &str) -> bool;

    /// Records `tweet_id` as liked. Durable implementations persist before returning.
    fn add(&mut self, tweet_id: &str) -> Result<(), CacheError>;
}

/// In-memory cache with no persistence.
#[derive(Debug, Default, Clone)]
pub struct MemoryLikeCache {
    ids: BTreeSet<String>,
}

impl MemoryLikeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for MemoryLikeCache {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl LikeCache for MemoryLikeCache {
    fn contains(&self, tweet_id: &str) -> bool {
        self.ids.contains(tweet_id)
    }

    fn add(&mut self, tweet_id: &str) -> Result<(), CacheError> {
        if !is_valid_tweet_id(tweet_id) {
            return Err(CacheError::InvalidId(tweet_id.to_string()));
        }
        self.ids.insert(tweet_id.to_string());
        Ok(())
    }
}

/// File-backed cache, one tweet ID per line.
///
/// Every `add` rewrites the whole set to a sibling temp file, fsyncs it and
/// renames it over the cache file, so a crash leaves either the old or the new
/// file and never a partial entry.
#[derive(Debug)]
pub struct FileLikeCache {
    path: PathBuf,
    ids: BTreeSet<String>,
}

impl FileLikeCache {
    /// Opens the cache at `path`. A missing file is an empty cache.
    ///
    /// # Returns
    ///
    /// - `Ok(FileLikeCache)`: With every non-blank line loaded as an ID
    /// - `Err(CacheError::Read)`: If the file exists but cannot be read
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();

        let ids: BTreeSet<String> = match fs::read_to_string(&path) {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(
                    "No like cache at {}, starting with an empty cache",
                    path.display()
                );
                BTreeSet::new()
            }
            Err(source) => return Err(CacheError::Read { path, source }),
        };

        debug!(
            "Loaded {} liked tweet IDs from {}",
            ids.len(),
            path.display()
        );
        Ok(Self { path, ids })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "liked_tweets".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn persist(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.temp_path();
        let mut contents = String::new();
        for id in &self.ids {
            contents.push_str(id);
            contents.push('\n');
        }

        let result = (|| {
            let mut file = File::create(&temp_path)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
            fs::rename(&temp_path, &self.path)
        })();

        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result
    }
}

impl LikeCache for FileLikeCache {
    fn contains(&self, tweet_id: &str) -> bool {
        self.ids.contains(tweet_id)
    }

    fn add(&mut self, tweet_id: &str) -> Result<(), CacheError> {
        if !is_valid_tweet_id(tweet_id) {
            return Err(CacheError::InvalidId(tweet_id.to_string()));
        }
        if !self.ids.insert(tweet_id.to_string()) {
            return Ok(());
        }

        if let Err(source) = self.persist() {
            // Keep memory and disk in agreement
            self.ids.remove(tweet_id);
            return Err(CacheError::Write {
                path: self.path.clone(),
                source,
            });
        }

        debug!(
            "Recorded tweet {} in like cache {}",
            tweet_id,
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty_cache() {
        let dir = tempdir().unwrap();
        let cache = FileLikeCache::open(dir.path().join("likes.txt")).unwrap();
        assert!(cache.is_empty());
        assert!(!cache.contains("1"));
    }

    #[test]
    fn test_add_persists_before_returning() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("likes.txt");

        let mut cache = FileLikeCache::open(&path).unwrap();
        cache.add("1234567890123456789").unwrap();
        assert!(cache.contains("1234567890123456789"));

        // A fresh handle sees the entry without any explicit flush
        let reopened = FileLikeCache::open(&path).unwrap();
        assert!(reopened.contains("1234567890123456789"));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "1234567890123456789\n"
        );
        assert!(!cache.temp_path().exists());
    }

    #[test]
    fn test_add_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("likes.txt");

        let mut cache = FileLikeCache::open(&path).unwrap();
        cache.add("42").unwrap();
        cache.add("42").unwrap();
        cache.add("7").unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "42\n7\n");
    }

    #[test]
    fn test_open_skips_blank_lines_and_whitespace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("likes.txt");
        fs::write(&path, "  111 \n\n222\r\n   \n").unwrap();

        let cache = FileLikeCache::open(&path).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.contains("111"));
        assert!(cache.contains("222"));
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("state").join("likes.txt");

        let mut cache = FileLikeCache::open(&path).unwrap();
        cache.add("99").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_failed_write_leaves_cache_unchanged() {
        let dir = tempdir().unwrap();
        // The cache path is a directory, so the final rename cannot succeed
        let path = dir.path().join("occupied");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let mut cache = FileLikeCache {
            path: path.clone(),
            ids: BTreeSet::new(),
        };
        assert!(matches!(cache.add("5"), Err(CacheError::Write { .. })));
        assert!(!cache.contains("5"));
    }

    #[test]
    fn test_memory_cache() {
        let mut cache: MemoryLikeCache = ["1", "2"].into_iter().collect();
        assert!(cache.contains("1"));
        assert!(!cache.contains("3"));
        cache.add("3").unwrap();
        assert!(cache.contains("3"));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_multi_line_id_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("likes.txt");

        let mut cache = FileLikeCache::open(&path).unwrap();
        for bad in ["111\n222", "111\r222", "111 222", ""] {
            assert!(
                matches!(cache.add(bad), Err(CacheError::InvalidId(_))),
                "{:?} was accepted",
                bad
            );
        }
        assert!(cache.is_empty());
        assert!(!path.exists());

        let mut memory = MemoryLikeCache::new();
        assert!(matches!(
            memory.add("111\n222"),
            Err(CacheError::InvalidId(_))
        ));
        assert!(memory.is_empty());
    }
}
