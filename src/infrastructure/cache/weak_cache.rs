//! Non-retaining cache tier.

use std::collections::HashMap;
use std::sync::Weak;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::DynamicImage;
use parking_lot::RwLock;
use tracing::trace;

use crate::domain::entities::{CacheKey, CacheValue, Size};

/// Number of mutating operations between sweeps of dead observations.
pub const CLEANUP_INTERVAL: usize = 10;

#[derive(Debug)]
struct WeakValue {
    image: Weak<DynamicImage>,
    is_sampled: bool,
    size: Size,
}

/// Observes images without extending their lifetime.
///
/// An entry resolves only while something else (the strong tier or a
/// consumer) still holds the image's `Arc`.
#[derive(Debug, Default)]
pub struct WeakMemoryCache {
    entries: RwLock<HashMap<CacheKey, WeakValue>>,
    operations_since_cleanup: AtomicUsize,
}

impl WeakMemoryCache {
    /// Creates an empty tier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value if its image is still alive.
    pub fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        let entries = self.entries.read();
        let weak = entries.get(key)?;
        weak.image
            .upgrade()
            .map(|image| CacheValue::new(image, weak.is_sampled, weak.size))
    }

    /// Records an observation of `value`, replacing any previous one.
    pub fn set(&self, key: CacheKey, value: &CacheValue) {
        {
            let mut entries = self.entries.write();
            entries.insert(
                key,
                WeakValue {
                    image: std::sync::Arc::downgrade(&value.image),
                    is_sampled: value.is_sampled,
                    size: value.size,
                },
            );
        }
        self.cleanup_if_necessary();
    }

    /// Removes an observation. Returns true if one was present and alive.
    pub fn remove(&self, key: &CacheKey) -> bool {
        let removed = self.entries.write().remove(key);
        self.cleanup_if_necessary();
        removed.is_some_and(|w| w.image.strong_count() > 0)
    }

    /// Drops all observations.
    pub fn clear(&self) {
        self.entries.write().clear();
        self.operations_since_cleanup.store(0, Ordering::Relaxed);
    }

    /// Drops observations whose image is gone.
    pub fn cleanup(&self) {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, w| w.image.strong_count() > 0);
        self.operations_since_cleanup.store(0, Ordering::Relaxed);
        let pruned = before - entries.len();
        if pruned > 0 {
            trace!(pruned, remaining = entries.len(), "Pruned dead weak cache entries");
        }
    }

    /// Number of observations, including ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if there are no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cleanup_if_necessary(&self) {
        if self.operations_since_cleanup.fetch_add(1, Ordering::Relaxed) + 1 >= CLEANUP_INTERVAL {
            self.cleanup();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn value(w: u32, h: u32) -> CacheValue {
        CacheValue::new(Arc::new(DynamicImage::new_rgba8(w, h)), false, Size::Original)
    }

    #[test]
    fn test_get_while_alive() {
        let cache = WeakMemoryCache::new();
        let key = CacheKey::new("a").unwrap();
        let v = value(2, 2);

        cache.set(key.clone(), &v);
        let got = cache.get(&key).unwrap();
        assert!(Arc::ptr_eq(&got.image, &v.image));
    }

    #[test]
    fn test_does_not_retain() {
        let cache = WeakMemoryCache::new();
        let key = CacheKey::new("a").unwrap();
        let v = value(2, 2);

        cache.set(key.clone(), &v);
        drop(v);
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn test_periodic_cleanup() {
        let cache = WeakMemoryCache::new();
        for i in 0..CLEANUP_INTERVAL - 1 {
            let v = value(1, 1);
            cache.set(CacheKey::new(format!("k{i}")).unwrap(), &v);
        }
        assert_eq!(cache.len(), CLEANUP_INTERVAL - 1);

        let alive = value(1, 1);
        cache.set(CacheKey::new("alive").unwrap(), &alive);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove_reports_live_entry() {
        let cache = WeakMemoryCache::new();
        let key = CacheKey::new("a").unwrap();
        let v = value(1, 1);

        cache.set(key.clone(), &v);
        assert!(cache.remove(&key));
        assert!(!cache.remove(&key));
    }
}
