//! Disk cache for raw fetched bytes.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};

use crate::domain::errors::{CacheError, CacheResult};

/// Maximum disk cache size in bytes (250 MB default).
pub const DEFAULT_MAX_CACHE_SIZE: u64 = 250 * 1024 * 1024;

const ENTRY_EXTENSION: &str = "bin";

/// Disk cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskCacheConfig {
    /// Enable the disk cache for network fetches.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache directory; defaults to the platform cache dir.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Maximum size in bytes.
    #[serde(default = "default_max_size")]
    pub max_size_bytes: u64,
}

const fn default_true() -> bool {
    true
}

const fn default_max_size() -> u64 {
    DEFAULT_MAX_CACHE_SIZE
}

impl Default for DiskCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            max_size_bytes: DEFAULT_MAX_CACHE_SIZE,
        }
    }
}

impl DiskCacheConfig {
    /// Returns the configured directory or the platform default.
    #[must_use]
    pub fn effective_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(default_cache_dir)
    }
}

/// Persists raw fetched bytes keyed by source identity.
#[derive(Debug)]
pub struct DiskCache {
    cache_dir: PathBuf,
    max_size: u64,
    current_size: AtomicU64,
    item_count: AtomicUsize,
}

impl DiskCache {
    /// Opens a disk cache in `cache_dir`, creating it if needed.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created or read.
    pub async fn new(cache_dir: PathBuf, max_size: u64) -> CacheResult<Self> {
        fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to create cache dir: {e}")))?;

        let mut total_size = 0u64;
        let mut count = 0usize;
        let mut entries = fs::read_dir(&cache_dir)
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to read cache dir: {e}")))?;

        while let Ok(Some(entry)) = entries.next_entry().await {
            if is_entry(&entry.path())
                && let Ok(meta) = entry.metadata().await
            {
                total_size += meta.len();
                count += 1;
            }
        }

        let cache = Self {
            cache_dir,
            max_size,
            current_size: AtomicU64::new(total_size),
            item_count: AtomicUsize::new(count),
        };
        debug!(
            dir = %cache.cache_dir.display(),
            size = total_size,
            entries = count,
            "Opened disk cache"
        );

        cache.cleanup_if_needed().await;
        Ok(cache)
    }

    /// Opens a disk cache from configuration.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created or read.
    pub async fn from_config(config: &DiskCacheConfig) -> CacheResult<Self> {
        Self::new(config.effective_directory(), config.max_size_bytes).await
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.cache_dir
            .join(format!("{}.{ENTRY_EXTENSION}", hex::encode(&digest[..16])))
    }

    /// Reads cached bytes for `key`.
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        let path = self.entry_path(key);
        match fs::read(&path).await {
            Ok(bytes) => {
                trace!(key, path = %path.display(), "Disk cache hit");
                Some(Bytes::from(bytes))
            }
            Err(_) => {
                trace!(key, "Disk cache miss");
                None
            }
        }
    }

    /// Stores bytes for `key`.
    ///
    /// # Errors
    /// Returns error if the entry cannot be written.
    pub async fn put(&self, key: &str, bytes: &[u8]) -> CacheResult<()> {
        let path = self.entry_path(key);
        let old_size = fs::metadata(&path).await.map(|m| m.len()).ok();

        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to create cache file: {e}")))?;
        file.write_all(bytes)
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to write cache file: {e}")))?;
        file.flush()
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to flush cache file: {e}")))?;

        let new_size = bytes.len() as u64;
        match old_size {
            Some(old) if new_size >= old => {
                self.current_size.fetch_add(new_size - old, Ordering::Relaxed);
            }
            Some(old) => {
                self.current_size.fetch_sub(old - new_size, Ordering::Relaxed);
            }
            None => {
                self.current_size.fetch_add(new_size, Ordering::Relaxed);
                self.item_count.fetch_add(1, Ordering::Relaxed);
            }
        }

        debug!(key, size = bytes.len(), "Stored entry in disk cache");
        self.cleanup_if_needed().await;
        Ok(())
    }

    /// Removes the entry for `key`.
    pub async fn remove(&self, key: &str) {
        let path = self.entry_path(key);
        let size = fs::metadata(&path).await.map(|m| m.len()).ok();
        if let Err(e) = fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(key, error = %e, "Failed to remove disk cache entry");
            }
        } else if let Some(s) = size {
            self.current_size.fetch_sub(s, Ordering::Relaxed);
            self.item_count.fetch_sub(1, Ordering::Relaxed);
            debug!(key, "Removed disk cache entry");
        }
    }

    /// Removes every entry.
    ///
    /// # Errors
    /// Returns error if the cache directory cannot be read.
    pub async fn clear(&self) -> CacheResult<()> {
        let mut entries = fs::read_dir(&self.cache_dir)
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to read cache dir: {e}")))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to read entry: {e}")))?
        {
            let path = entry.path();
            if is_entry(&path) && fs::remove_file(&path).await.is_err() {
                warn!(path = %path.display(), "Failed to remove cache file");
            }
        }
        self.current_size.store(0, Ordering::Relaxed);
        self.item_count.store(0, Ordering::Relaxed);
        debug!("Cleared disk cache");
        Ok(())
    }

    /// Returns true if `key` has an entry.
    pub async fn contains(&self, key: &str) -> bool {
        fs::try_exists(self.entry_path(key)).await.unwrap_or(false)
    }

    /// Bytes on disk.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.current_size.load(Ordering::Relaxed)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.item_count.load(Ordering::Relaxed)
    }

    /// Returns true if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cache directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.cache_dir
    }

    /// Deletes the oldest entries once over budget, leaving 10% headroom.
    async fn cleanup_if_needed(&self) {
        let current_size = self.size();
        if current_size <= self.max_size {
            return;
        }

        debug!(
            current_size,
            max_size = self.max_size,
            "Disk cache over limit, cleaning up"
        );

        let Ok(mut entries) = fs::read_dir(&self.cache_dir).await else {
            return;
        };

        let mut files: Vec<(PathBuf, std::time::SystemTime, u64)> = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if !is_entry(&path) {
                continue;
            }
            if let Ok(meta) = entry.metadata().await {
                let stamp = meta
                    .modified()
                    .or_else(|_| meta.accessed())
                    .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
                files.push((path, stamp, meta.len()));
            }
        }
        files.sort_by_key(|(_, time, _)| *time);

        let target = current_size - self.max_size + (self.max_size / 10);
        let mut freed_size = 0u64;
        let mut freed_count = 0usize;

        for (path, _, size) in files {
            if freed_size >= target {
                break;
            }
            if let Err(e) = fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove old cache file");
            } else {
                freed_size += size;
                freed_count += 1;
            }
        }
        self.current_size.fetch_sub(freed_size, Ordering::Relaxed);
        self.item_count.fetch_sub(freed_count, Ordering::Relaxed);

        debug!(freed_size, freed_count, "Disk cache cleanup complete");
    }
}

fn is_entry(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION)
}

/// Returns the default cache directory path.
fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from(
        crate::APP_QUALIFIER,
        crate::APP_ORGANIZATION,
        crate::NAME,
    )
    .map_or_else(
        || std::env::temp_dir().join(crate::NAME).join("cache"),
        |dirs| dirs.cache_dir().join("http"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_cache(max: u64) -> (DiskCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskCache::new(temp_dir.path().to_path_buf(), max)
            .await
            .unwrap();
        (cache, temp_dir)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (cache, _temp) = create_test_cache(1024).await;
        cache.put("https://a/img.png", b"payload").await.unwrap();

        assert_eq!(
            cache.get("https://a/img.png").await.as_deref(),
            Some(&b"payload"[..])
        );
        assert!(cache.get("https://a/other.png").await.is_none());
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let (cache, _temp) = create_test_cache(1024).await;
        cache.put("a", b"1").await.unwrap();
        cache.put("b", b"22").await.unwrap();
        assert_eq!(cache.len(), 2);

        cache.remove("a").await;
        assert!(!cache.contains("a").await);
        assert_eq!(cache.size(), 2);

        cache.clear().await.unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
    }

    #[tokio::test]
    async fn test_counters_track_overwrites() {
        let (cache, _temp) = create_test_cache(1024).await;
        cache.put("a", b"hello").await.unwrap();
        cache.put("b", b"world!").await.unwrap();
        assert_eq!(cache.size(), 11);

        cache.put("a", b"hey").await.unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.size(), 9);
    }

    #[tokio::test]
    async fn test_cleanup_over_budget() {
        let (cache, _temp) = create_test_cache(10).await;
        cache.put("a", b"123456").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        cache.put("b", b"123456").await.unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.size(), 6);
        assert!(cache.contains("b").await);
    }

    #[tokio::test]
    async fn test_reopen_counts_existing_entries() {
        let temp_dir = TempDir::new().unwrap();
        {
            let cache = DiskCache::new(temp_dir.path().to_path_buf(), 1024).await.unwrap();
            cache.put("a", b"abc").await.unwrap();
        }
        let reopened = DiskCache::new(temp_dir.path().to_path_buf(), 1024).await.unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.size(), 3);
    }
}
