//! Two-tier in-memory image cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::domain::entities::{CacheKey, CacheValue};

use super::strong_cache::StrongMemoryCache;
use super::weak_cache::WeakMemoryCache;

/// Default strong tier budget (64 MiB).
pub const DEFAULT_MAX_SIZE_BYTES: usize = 64 * 1024 * 1024;

/// Default fraction of the budget kept on moderate memory pressure.
pub const DEFAULT_TRIM_FRACTION: f64 = 0.5;

/// Memory pressure signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TrimLevel {
    /// Shrink the strong tier to the configured fraction of its budget.
    Moderate,
    /// The host is going to the background; drop the strong tier.
    Background,
    /// Drop the strong tier.
    Critical,
}

/// Memory cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCacheConfig {
    /// Strong tier byte budget.
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: usize,

    /// Retain values in the strong tier.
    #[serde(default = "default_true")]
    pub strong_references_enabled: bool,

    /// Observe values in the weak tier.
    #[serde(default = "default_true")]
    pub weak_references_enabled: bool,

    /// Fraction of the budget kept on [`TrimLevel::Moderate`].
    #[serde(default = "default_trim_fraction")]
    pub trim_fraction: f64,
}

const fn default_max_size_bytes() -> usize {
    DEFAULT_MAX_SIZE_BYTES
}

const fn default_true() -> bool {
    true
}

const fn default_trim_fraction() -> f64 {
    DEFAULT_TRIM_FRACTION
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            strong_references_enabled: true,
            weak_references_enabled: true,
            trim_fraction: DEFAULT_TRIM_FRACTION,
        }
    }
}

/// In-memory cache for decoded images with a retaining strong tier and an
/// observing weak tier.
///
/// Thread-safe; share it as `Arc<MemoryCache>` between loaders.
pub struct MemoryCache {
    strong: Option<StrongMemoryCache>,
    weak: Option<Arc<WeakMemoryCache>>,
    trim_fraction: f64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCache {
    /// Creates a cache with both tiers and the given strong tier budget.
    #[must_use]
    pub fn new(max_size_bytes: usize) -> Self {
        Self::from_config(&MemoryCacheConfig {
            max_size_bytes,
            ..MemoryCacheConfig::default()
        })
    }

    /// Creates a cache from configuration.
    #[must_use]
    pub fn from_config(config: &MemoryCacheConfig) -> Self {
        let weak = config
            .weak_references_enabled
            .then(|| Arc::new(WeakMemoryCache::new()));
        let strong = config
            .strong_references_enabled
            .then(|| StrongMemoryCache::new(config.max_size_bytes, weak.clone()));
        debug!(
            max_size_bytes = config.max_size_bytes,
            strong = config.strong_references_enabled,
            weak = config.weak_references_enabled,
            "Created memory cache"
        );
        Self {
            strong,
            weak,
            trim_fraction: config.trim_fraction.clamp(0.0, 1.0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Looks up the strong tier, then the weak tier.
    pub fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        let found = self
            .strong
            .as_ref()
            .and_then(|s| s.get(key))
            .or_else(|| self.weak.as_ref().and_then(|w| w.get(key)));

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache miss");
        }
        found
    }

    /// Stores a value in every enabled tier.
    pub fn set(&self, key: CacheKey, value: CacheValue) {
        if let Some(weak) = &self.weak {
            weak.set(key.clone(), &value);
        }
        if let Some(strong) = &self.strong {
            trace!(key = %key, cost = value.byte_size(), "Storing in memory cache");
            strong.set(key, value);
        }
    }

    /// Removes a value from both tiers. Returns true if either held it.
    pub fn remove(&self, key: &CacheKey) -> bool {
        let strong = self.strong.as_ref().and_then(|s| s.remove(key)).is_some();
        let weak = self.weak.as_ref().is_some_and(|w| w.remove(key));
        if strong || weak {
            debug!(key = %key, "Removed from memory cache");
        }
        strong || weak
    }

    /// Clears both tiers.
    pub fn clear(&self) {
        if let Some(strong) = &self.strong {
            strong.clear();
        }
        if let Some(weak) = &self.weak {
            weak.clear();
        }
        debug!("Cleared memory cache");
    }

    /// Reacts to memory pressure by shrinking the strong tier.
    ///
    /// Only drops the cache's own retention; images held elsewhere stay
    /// reachable through the weak tier.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn trim_memory(&self, level: TrimLevel) {
        if let Some(strong) = &self.strong {
            match level {
                TrimLevel::Background | TrimLevel::Critical => strong.clear(),
                TrimLevel::Moderate => {
                    let target = (strong.max_size() as f64 * self.trim_fraction) as usize;
                    strong.trim_to_size(target);
                }
            }
            info!(?level, remaining = strong.size(), "Trimmed memory cache");
        }
        if let Some(weak) = &self.weak {
            weak.cleanup();
        }
    }

    /// Bytes retained by the strong tier.
    #[must_use]
    pub fn size(&self) -> usize {
        self.strong.as_ref().map_or(0, StrongMemoryCache::size)
    }

    /// Strong tier budget.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.strong.as_ref().map_or(0, StrongMemoryCache::max_size)
    }

    /// Keys retained by the strong tier, most recent first.
    #[must_use]
    pub fn keys(&self) -> Vec<CacheKey> {
        self.strong.as_ref().map_or_else(Vec::new, StrongMemoryCache::keys)
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
            entries: self.strong.as_ref().map_or(0, StrongMemoryCache::len),
            size_bytes: self.size(),
            max_size_bytes: self.max_size(),
            weak_entries: self.weak.as_ref().map_or(0, |w| w.len()),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::from_config(&MemoryCacheConfig::default())
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("strong", &self.strong)
            .field("weak_entries", &self.weak.as_ref().map(|w| w.len()))
            .finish_non_exhaustive()
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Entries retained by the strong tier.
    pub entries: usize,
    /// Bytes retained by the strong tier.
    pub size_bytes: usize,
    /// Strong tier budget.
    pub max_size_bytes: usize,
    /// Observations held by the weak tier, including unpruned dead ones.
    pub weak_entries: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images ({} / {} bytes), {:.1}% hit rate ({} hits, {} misses)",
            self.entries, self.size_bytes, self.max_size_bytes, self.hit_rate, self.hits, self.misses
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Size;
    use image::DynamicImage;

    fn value_of(bytes: u32) -> CacheValue {
        CacheValue::new(
            Arc::new(DynamicImage::new_rgba8(bytes / 4, 1)),
            false,
            Size::Original,
        )
    }

    fn key(s: &str) -> CacheKey {
        CacheKey::new(s).unwrap()
    }

    #[test]
    fn test_cache_put_and_get() {
        let cache = MemoryCache::new(1000);
        cache.set(key("a"), value_of(100));
        let got = cache.get(&key("a")).unwrap();
        assert_eq!(got.image.width(), 25);
    }

    #[test]
    fn test_cache_miss() {
        let cache = MemoryCache::new(1000);
        assert!(cache.get(&key("missing")).is_none());
    }

    #[test]
    fn test_remove_acts_on_both_tiers() {
        let cache = MemoryCache::new(1000);
        let v = value_of(100);
        cache.set(key("a"), v.clone());
        assert!(cache.remove(&key("a")));
        assert!(cache.get(&key("a")).is_none());
        assert!(!cache.remove(&key("a")));
    }

    #[test]
    fn test_oversized_value_only_observed() {
        let cache = MemoryCache::new(100);
        let big = value_of(400);
        cache.set(key("big"), big.clone());
        assert_eq!(cache.size(), 0);
        assert!(cache.get(&key("big")).is_some());
        drop(big);
        assert!(cache.get(&key("big")).is_none());
    }

    #[test]
    fn test_trim_critical_keeps_referenced_images_reachable() {
        let cache = MemoryCache::new(1000);
        let held = value_of(100);
        cache.set(key("a"), held.clone());
        cache.set(key("b"), value_of(200));
        cache.set(key("c"), value_of(300));
        assert_eq!(cache.size(), 600);

        cache.trim_memory(TrimLevel::Critical);

        assert_eq!(cache.size(), 0);
        assert!(cache.keys().is_empty());
        assert!(cache.get(&key("a")).is_some());
        assert!(cache.get(&key("b")).is_none());
        assert!(cache.get(&key("c")).is_none());
    }

    #[test]
    fn test_trim_moderate_halves_budget() {
        let cache = MemoryCache::new(1000);
        cache.set(key("a"), value_of(200));
        cache.set(key("b"), value_of(200));
        cache.set(key("c"), value_of(400));
        cache.trim_memory(TrimLevel::Moderate);
        assert!(cache.size() <= 500);
        assert_eq!(cache.keys(), vec![key("c")]);
    }

    #[test]
    fn test_strong_disabled() {
        let cache = MemoryCache::from_config(&MemoryCacheConfig {
            strong_references_enabled: false,
            ..MemoryCacheConfig::default()
        });
        let v = value_of(100);
        cache.set(key("a"), v.clone());
        assert_eq!(cache.size(), 0);
        assert!(cache.get(&key("a")).is_some());
        drop(v);
        assert!(cache.get(&key("a")).is_none());
    }

    #[test]
    fn test_weak_disabled() {
        let cache = MemoryCache::from_config(&MemoryCacheConfig {
            max_size_bytes: 100,
            weak_references_enabled: false,
            ..MemoryCacheConfig::default()
        });
        let held = value_of(100);
        cache.set(key("a"), held.clone());
        cache.set(key("b"), value_of(100));
        assert!(cache.get(&key("a")).is_none());
    }

    #[test]
    fn test_cache_stats() {
        let cache = MemoryCache::new(1000);
        cache.set(key("a"), value_of(100));
        let _ = cache.get(&key("a"));
        let _ = cache.get(&key("missing"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.size_bytes, 100);
    }

    #[test]
    fn test_concurrent_writers_respect_budget() {
        let cache = Arc::new(MemoryCache::new(2000));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..50u32 {
                        cache.set(key(&format!("{t}-{i}")), value_of(((i % 5) + 1) * 80));
                        assert!(cache.size() <= cache.max_size());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(cache.size() <= 2000);
    }
}
