//! Configuration management for Bazelisk

pub mod schema;

pub use schema::{
    Config, ENV_BASE_URL, ENV_CLEAN, ENV_GITHUB_TOKEN, ENV_HOME, ENV_SHUTDOWN, ENV_SKIP_WRAPPER,
    ENV_VERSION,
};

use crate::error::{BazeliskError, BazeliskResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bazelisk")
            .join("config.toml")
    }

    /// Get the default cache home
    pub fn default_home() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bazelisk")
    }

    /// Cache home for `config`, honouring its override
    pub fn home(config: &Config) -> PathBuf {
        config.home.clone().unwrap_or_else(Self::default_home)
    }

    /// Load configuration from file (defaults when missing), then overlay the
    /// process environment
    pub async fn load(&self) -> BazeliskResult<Config> {
        let mut config = self.load_file().await?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from the config file only
    pub async fn load_file(&self) -> BazeliskResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> BazeliskResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| BazeliskError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| BazeliskError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Ensure the cache home exists and return it
    pub async fn ensure_home(config: &Config) -> BazeliskResult<PathBuf> {
        let home = Self::home(config);
        fs::create_dir_all(&home)
            .await
            .map_err(|e| BazeliskError::io(format!("creating directory {}", home.display()), e))?;
        Ok(home)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("nonexistent.toml"));

        let config = manager.load_file().await.unwrap();
        assert_eq!(config.log_format, "text");
    }

    #[tokio::test]
    async fn load_reads_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        tokio::fs::write(&path, "base_url = \"https://mirror.example.com\"\n")
            .await
            .unwrap();

        let config = ConfigManager::with_path(path).load_file().await.unwrap();
        assert_eq!(config.base_url(), Some("https://mirror.example.com"));
    }

    #[tokio::test]
    async fn malformed_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        tokio::fs::write(&path, "shutdown = \"yes please\"\n").await.unwrap();

        let err = ConfigManager::with_path(path).load_file().await.unwrap_err();
        assert!(matches!(err, BazeliskError::ConfigInvalid { .. }));
    }

    #[tokio::test]
    async fn ensure_home_creates_override() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            home: Some(temp.path().join("nested").join("home")),
            ..Config::default()
        };

        let home = ConfigManager::ensure_home(&config).await.unwrap();
        assert!(home.is_dir());
    }
}
