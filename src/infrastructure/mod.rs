//! Infrastructure layer with caches, providers and runtime plumbing.

/// Memory and disk caches.
pub mod cache;
/// Application configuration.
pub mod config;
/// Built-in decoders.
pub mod decode;
/// Execution contexts for pipeline stages.
pub mod dispatch;
/// Built-in mappers and fetchers.
pub mod fetch;
pub mod lifecycle;
pub mod logging;
/// Built-in transformations.
pub mod transform;

pub use cache::{CacheStats, DiskCache, MemoryCache, MemoryCacheConfig, TrimLevel};
pub use config::{AppConfig, CliArgs, ConfigError, LogLevel, StorageManager};
pub use dispatch::{Dispatcher, Dispatchers};
pub use lifecycle::{LifecycleGate, Viewport, ViewportSizeResolver};
pub use logging::LoggingEventListener;
