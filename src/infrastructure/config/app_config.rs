//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::entities::RequestDefaults;
use crate::infrastructure::cache::{DiskCacheConfig, MemoryCacheConfig};
use crate::infrastructure::dispatch::DispatchConfig;
use crate::infrastructure::fetch::HttpConfig;
use crate::{APP_ORGANIZATION, APP_QUALIFIER, NAME};

use super::args::CliArgs;

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, loaded from TOML and overridden by CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path. Logs go to stderr when unset.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log every pipeline stage boundary at debug level.
    #[serde(default)]
    pub log_events: bool,

    /// Memory cache settings.
    #[serde(default)]
    pub memory_cache: MemoryCacheConfig,

    /// Disk cache settings.
    #[serde(default)]
    pub disk_cache: DiskCacheConfig,

    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Stage concurrency settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Defaults applied to every request.
    #[serde(default)]
    pub defaults: RequestDefaults,
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if args.log_events {
            self.log_events = true;
        }
        if let Some(precision) = args.precision {
            self.defaults.precision = precision;
        }
        if let Some(scale) = args.scale {
            self.defaults.scale = scale;
        }
        if let Some(policy) = args.memory_cache_policy {
            self.defaults.memory_cache_policy = policy;
        }
        if let Some(policy) = args.disk_cache_policy {
            self.defaults.disk_cache_policy = policy;
        }
        if !args.allowed_formats.is_empty() {
            self.defaults.allowed_formats.clone_from(&args.allowed_formats);
        }
        if let Some(bytes) = args.memory_cache_bytes {
            self.memory_cache.max_size_bytes = bytes;
        }
        if args.no_disk_cache {
            self.disk_cache.enabled = false;
        }
        if let Some(dir) = &args.disk_cache_dir {
            self.disk_cache.directory = Some(dir.clone());
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns effective config path.
    #[must_use]
    pub fn effective_config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(Self::default_config_path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            log_level: LogLevel::Info,
            log_events: false,
            memory_cache: MemoryCacheConfig::default(),
            disk_cache: DiskCacheConfig::default(),
            http: HttpConfig::default(),
            dispatch: DispatchConfig::default(),
            defaults: RequestDefaults::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{CachePolicy, PixelFormat, Precision, Scale};
    use clap::Parser;

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
            log_level = "debug"

            [memory_cache]
            max_size_bytes = 1048576
            weak_references_enabled = false

            [dispatch]
            max_concurrent_fetches = 8

            [defaults]
            precision = "exact"
            disk_cache_policy = "read_only"
            allowed_formats = ["rgba8"]
        "#;

        let config: AppConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.memory_cache.max_size_bytes, 1_048_576);
        assert!(config.memory_cache.strong_references_enabled);
        assert!(!config.memory_cache.weak_references_enabled);
        assert_eq!(config.dispatch.max_concurrent_fetches, 8);
        assert_eq!(config.dispatch.max_concurrent_decodes, 2);
        assert_eq!(config.defaults.precision, Precision::Exact);
        assert_eq!(config.defaults.scale, Scale::Fit);
        assert_eq!(config.defaults.disk_cache_policy, CachePolicy::ReadOnly);
        assert_eq!(config.defaults.allowed_formats, vec![PixelFormat::Rgba8]);
        assert!(config.disk_cache.enabled);
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(!config.log_events);
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.defaults, RequestDefaults::default());
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let mut config: AppConfig = toml::from_str(
            r#"
            [defaults]
            scale = "fill"
            memory_cache_policy = "disabled"
        "#,
        )
        .unwrap();

        let args = CliArgs::parse_from([
            "imgpipe",
            "--scale",
            "fit",
            "--log-level",
            "trace",
            "--no-disk-cache",
            "image.png",
        ]);
        config.merge_with_args(&args);

        assert_eq!(config.defaults.scale, Scale::Fit);
        assert_eq!(config.defaults.memory_cache_policy, CachePolicy::Disabled);
        assert_eq!(config.log_level, LogLevel::Trace);
        assert!(!config.disk_cache.enabled);
    }
}
