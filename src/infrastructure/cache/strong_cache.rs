//! Byte-bounded LRU cache tier.

use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::{CacheKey, CacheValue};

use super::weak_cache::WeakMemoryCache;

struct StrongState {
    entries: LruCache<CacheKey, CacheValue>,
    current_size: usize,
    max_size: usize,
}

/// Retains decoded images up to a byte budget, evicting least recently used
/// entries first.
///
/// All mutations happen under one lock, so no caller ever observes
/// `size() > max_size()`. Evicted entries are handed to the weak tier when one
/// is attached.
pub struct StrongMemoryCache {
    state: Mutex<StrongState>,
    weak: Option<Arc<WeakMemoryCache>>,
}

impl StrongMemoryCache {
    /// Creates a tier with the given byte budget.
    #[must_use]
    pub fn new(max_size: usize, weak: Option<Arc<WeakMemoryCache>>) -> Self {
        Self {
            state: Mutex::new(StrongState {
                entries: LruCache::unbounded(),
                current_size: 0,
                max_size,
            }),
            weak,
        }
    }

    /// Returns a value and marks it most recently used.
    pub fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        self.state.lock().entries.get(key).cloned()
    }

    /// Returns a value without touching recency.
    pub fn peek(&self, key: &CacheKey) -> Option<CacheValue> {
        self.state.lock().entries.peek(key).cloned()
    }

    /// Inserts or replaces a value. Returns false if the value alone exceeds
    /// the budget, in which case any previous entry for `key` is dropped too.
    pub fn set(&self, key: CacheKey, value: CacheValue) -> bool {
        let cost = value.byte_size();
        let mut state = self.state.lock();

        if cost > state.max_size {
            if let Some(old) = state.entries.pop(&key) {
                state.current_size -= old.byte_size();
            }
            debug!(
                key = %key,
                cost,
                max_size = state.max_size,
                "Value larger than memory cache budget, not retained"
            );
            return false;
        }

        if let Some(old) = state.entries.put(key, value) {
            state.current_size -= old.byte_size();
        }
        state.current_size += cost;

        let max_size = state.max_size;
        self.evict_to(&mut state, max_size);
        true
    }

    /// Removes a value.
    pub fn remove(&self, key: &CacheKey) -> Option<CacheValue> {
        let mut state = self.state.lock();
        let old = state.entries.pop(key)?;
        state.current_size -= old.byte_size();
        Some(old)
    }

    /// Removes every value.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        self.evict_to(&mut state, 0);
    }

    /// Evicts least recently used values until at most `size` bytes remain.
    pub fn trim_to_size(&self, size: usize) {
        let mut state = self.state.lock();
        self.evict_to(&mut state, size);
    }

    /// Bytes currently retained.
    #[must_use]
    pub fn size(&self) -> usize {
        self.state.lock().current_size
    }

    /// Byte budget.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.state.lock().max_size
    }

    /// Number of retained values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns true if nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys from most to least recently used.
    #[must_use]
    pub fn keys(&self) -> Vec<CacheKey> {
        self.state.lock().entries.iter().map(|(k, _)| k.clone()).collect()
    }

    fn evict_to(&self, state: &mut StrongState, size: usize) {
        while state.current_size > size {
            let Some((key, value)) = state.entries.pop_lru() else {
                break;
            };
            state.current_size -= value.byte_size();
            trace!(key = %key, freed = value.byte_size(), "Evicted from strong memory cache");
            if let Some(weak) = &self.weak {
                weak.set(key, &value);
            }
        }
        if state.entries.is_empty() {
            state.current_size = 0;
        }
    }
}

impl std::fmt::Debug for StrongMemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("StrongMemoryCache")
            .field("entries", &state.entries.len())
            .field("current_size", &state.current_size)
            .field("max_size", &state.max_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Size;
    use image::DynamicImage;

    /// An RGBA image costing exactly `bytes` (must be a multiple of 4).
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
    fn test_set_and_get() {
        let cache = StrongMemoryCache::new(1000, None);
        assert!(cache.set(key("a"), value_of(100)));
        assert_eq!(cache.size(), 100);
        assert!(cache.get(&key("a")).is_some());
    }

    #[test]
    fn test_replacement_updates_size() {
        let cache = StrongMemoryCache::new(1000, None);
        cache.set(key("a"), value_of(100));
        cache.set(key("a"), value_of(300));
        assert_eq!(cache.size(), 300);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_oversized_value_rejected() {
        let cache = StrongMemoryCache::new(100, None);
        cache.set(key("a"), value_of(40));
        assert!(!cache.set(key("a"), value_of(200)));
        assert!(cache.get(&key("a")).is_none());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_evicts_least_recently_accessed() {
        let cache = StrongMemoryCache::new(300, None);
        cache.set(key("a"), value_of(100));
        cache.set(key("b"), value_of(100));
        cache.set(key("c"), value_of(100));

        // touch "a" so "b" becomes the oldest
        assert!(cache.get(&key("a")).is_some());
        cache.set(key("d"), value_of(100));

        assert!(cache.peek(&key("a")).is_some());
        assert!(cache.peek(&key("b")).is_none());
        assert!(cache.peek(&key("c")).is_some());
        assert!(cache.peek(&key("d")).is_some());
        assert!(cache.size() <= cache.max_size());
    }

    #[test]
    fn test_size_invariant_under_mixed_operations() {
        let cache = StrongMemoryCache::new(1000, None);
        for i in 0..50u32 {
            let bytes = ((i * 37) % 400 + 1) * 4;
            cache.set(key(&format!("k{}", i % 7)), value_of(bytes));
            if i % 5 == 0 {
                cache.remove(&key(&format!("k{}", i % 3)));
            }
            assert!(cache.size() <= cache.max_size(), "iteration {i}");
        }
    }

    #[test]
    fn test_evicted_values_move_to_weak_tier() {
        let weak = Arc::new(WeakMemoryCache::new());
        let cache = StrongMemoryCache::new(100, Some(weak.clone()));
        let first = value_of(100);
        cache.set(key("a"), first.clone());
        cache.set(key("b"), value_of(100));

        assert!(cache.peek(&key("a")).is_none());
        assert!(weak.get(&key("a")).is_some());
        drop(first);
        assert!(weak.get(&key("a")).is_none());
    }

    #[test]
    fn test_trim_to_size() {
        let cache = StrongMemoryCache::new(1000, None);
        cache.set(key("a"), value_of(200));
        cache.set(key("b"), value_of(200));
        cache.set(key("c"), value_of(200));
        cache.trim_to_size(300);
        assert_eq!(cache.keys(), vec![key("c")]);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
    }
}
