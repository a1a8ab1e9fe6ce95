//! Image caches.
//!
//! - [`MemoryCache`]: decoded images, strong LRU tier plus weak tier
//! - [`DiskCache`]: raw fetched bytes

pub mod disk_cache;
pub mod memory_cache;
pub mod strong_cache;
pub mod weak_cache;

pub use disk_cache::{DiskCache, DiskCacheConfig};
pub use memory_cache::{CacheStats, MemoryCache, MemoryCacheConfig, TrimLevel};
pub use strong_cache::StrongMemoryCache;
pub use weak_cache::WeakMemoryCache;
