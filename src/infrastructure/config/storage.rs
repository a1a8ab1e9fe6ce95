use super::app_config::AppConfig;
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::{APP_ORGANIZATION, APP_QUALIFIER, NAME};

const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration loading errors.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ConfigError {
    #[error("failed to determine config directory")]
    ConfigDirNotFound,
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("toml deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

/// Reads and writes the configuration file.
pub struct StorageManager {
    config_dir: PathBuf,
}

impl StorageManager {
    /// Create a new `StorageManager` rooted at the platform config directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration directory cannot be determined.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or(ConfigError::ConfigDirNotFound)?;

        Ok(Self { config_dir })
    }

    /// Creates a new `StorageManager` with a specific directory (useful for testing).
    #[must_use]
    pub const fn with_dir(path: PathBuf) -> Self {
        Self { config_dir: path }
    }

    /// Returns the configuration directory path.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Loads the application configuration.
    ///
    /// An explicit `path_override` must exist. Without one, a missing default
    /// file yields the default configuration, and an unparsable default file
    /// is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, or if an explicit
    /// file is missing or cannot be parsed.
    pub fn load_config(&self, path_override: Option<&Path>) -> Result<AppConfig, ConfigError> {
        if let Some(path) = path_override {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            let content = fs::read_to_string(path)?;
            return Ok(toml::from_str(&content)?);
        }

        let config_path = self.config_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            info!(path = %config_path.display(), "Config file not found, using defaults");
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&config_path)?;
        match toml::from_str::<AppConfig>(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("Failed to parse config file: {}. Using defaults.", e);
                Ok(AppConfig::default())
            }
        }
    }

    /// Writes `config` to the default config file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be written.
    pub fn save_config(&self, config: &AppConfig) -> Result<PathBuf, ConfigError> {
        fs::create_dir_all(&self.config_dir)?;
        let path = self.config_dir.join(CONFIG_FILE_NAME);
        fs::write(&path, toml::to_string_pretty(config)?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_default_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let storage = StorageManager::with_dir(temp.path().to_path_buf());
        let config = storage.load_config(None).unwrap();
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let storage = StorageManager::with_dir(temp.path().to_path_buf());
        let missing = temp.path().join("nope.toml");
        assert!(matches!(
            storage.load_config(Some(&missing)),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let storage = StorageManager::with_dir(temp.path().join("nested"));
        let mut config = AppConfig::default();
        config.memory_cache.max_size_bytes = 4096;
        config.log_events = true;

        let path = storage.save_config(&config).unwrap();
        assert!(path.exists());

        let loaded = storage.load_config(None).unwrap();
        assert_eq!(loaded.memory_cache.max_size_bytes, 4096);
        assert!(loaded.log_events);
    }

    #[test]
    fn test_broken_default_file_falls_back() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "log_level = [").unwrap();
        let storage = StorageManager::with_dir(temp.path().to_path_buf());
        let config = storage.load_config(None).unwrap();
        assert!(!config.log_events);
    }
}
