//! Configuration management for cacheprog

pub mod schema;

pub use schema::{Config, LogFormat};

use crate::error::{CacheProgError, CacheProgResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Directory name used under the home directory when nothing else is set
const DEFAULT_CACHE_DIR_NAME: &str = ".gocacheprog";

/// Settings handed to the core after all sources are merged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Cache directory (may not exist yet)
    pub cache_dir: PathBuf,

    /// Verbosity level: 0 quiet, 1 verbose, 2+ trace
    pub verbosity: u8,

    /// Log output format
    pub log_format: LogFormat,
}

impl Settings {
    pub fn verbose(&self) -> bool {
        self.verbosity > 0
    }
}

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
            .join("cacheprog")
            .join("config.toml")
    }

    /// Default cache directory: `~/.gocacheprog`
    pub fn default_cache_dir() -> CacheProgResult<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(DEFAULT_CACHE_DIR_NAME))
            .ok_or(CacheProgError::NoCacheDir)
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> CacheProgResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> CacheProgResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| CacheProgError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| CacheProgError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Merge command-line values over the file configuration
    ///
    /// Cache directory precedence: `cache_dir` argument (flag or
    /// `GOCACHEPROG_DIR`), then `[cache] dir`, then `~/.gocacheprog`.
    pub fn resolve(
        config: &Config,
        cache_dir: Option<PathBuf>,
        verbosity: u8,
    ) -> CacheProgResult<Settings> {
        let cache_dir = match cache_dir.or_else(|| config.cache.dir.clone()) {
            Some(dir) => dir,
            None => Self::default_cache_dir()?,
        };

        let verbosity = if verbosity == 0 && config.general.verbose {
            1
        } else {
            verbosity
        };

        Ok(Settings {
            cache_dir,
            verbosity,
            log_format: config.general.log_format,
        })
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
