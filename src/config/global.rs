//! Global configuration management.
//!
//! The global configuration file lives at `~/.sfrefs/config.toml` and holds
//! the settings needed to reach the catalog lookup endpoint. It is optional:
//! a missing file yields the defaults, and every setting can also be given on
//! the command line.
//!
//! # Configuration File Format
//!
//! ```toml
//! [lookup]
//! endpoint = "https://shop.example.com/store/catalog/lookup"
//! timeout_secs = 10
//!
//! [lookup.headers]
//! x-publishable-api-key = "pk_01H..."
//! ```
//!
//! # Location
//!
//! 1. `SFREFS_CONFIG_PATH` environment variable, if set
//! 2. `~/.sfrefs/config.toml` (`%LOCALAPPDATA%\sfrefs\config.toml` on Windows)

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, CONFIG_PATH_ENV, DEFAULT_LOOKUP_TIMEOUT_SECS,
};
use crate::core::RefsError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Global configuration for storefront-refs.
///
/// # Examples
///
/// ```rust,no_run
/// use storefront_refs::config::GlobalConfig;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = GlobalConfig::load().await?;
/// if let Some(endpoint) = &config.lookup.endpoint {
///     println!("Resolving against {endpoint}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct GlobalConfig {
    /// Catalog lookup settings.
    #[serde(default)]
    pub lookup: LookupConfig,
}

/// Settings for the batched catalog lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LookupConfig {
    /// URL of the batch lookup endpoint (receives a JSON `POST`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Transport timeout for one lookup, in seconds.
    ///
    /// Default: 10
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra headers sent with every lookup, e.g. a publishable API key.
    ///
    /// Header values may carry credentials and are never logged.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_LOOKUP_TIMEOUT_SECS
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_timeout_secs(),
            headers: BTreeMap::new(),
        }
    }
}

impl LookupConfig {
    /// Lookup timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check that the lookup settings are usable.
    ///
    /// # Errors
    ///
    /// Returns [`RefsError::ConfigError`] if the timeout is zero or the
    /// endpoint is not an absolute `http`/`https` URL.
    pub fn validate(&self) -> Result<(), RefsError> {
        if self.timeout_secs == 0 {
            return Err(RefsError::ConfigError {
                message: "lookup.timeout_secs must be greater than zero".to_string(),
            });
        }

        if let Some(endpoint) = &self.endpoint {
            let url = reqwest::Url::parse(endpoint).map_err(|e| RefsError::ConfigError {
                message: format!("lookup.endpoint '{endpoint}' is not a valid URL: {e}"),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(RefsError::ConfigError {
                    message: format!("lookup.endpoint '{endpoint}' must use http or https"),
                });
            }
        }

        Ok(())
    }
}

impl GlobalConfig {
    /// Load global configuration from the default location.
    ///
    /// Returns the default configuration if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load global configuration from an explicit path, or the default
    /// location when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load global configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The file contains invalid TOML syntax
    /// - The lookup settings fail validation
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse global config from {}", path.display()))?;

        config
            .lookup
            .validate()
            .with_context(|| format!("Invalid global config at {}", path.display()))?;

        Ok(config)
    }

    /// Save global configuration to a specific file path.
    ///
    /// Creates parent directories as needed and writes pretty-formatted TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize global config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write global config to {}", path.display()))?;

        // Headers may hold API keys
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).await.with_context(|| {
                format!("Failed to set secure permissions on {}", path.display())
            })?;
        }

        Ok(())
    }

    /// Get the default file path for global configuration.
    ///
    /// Honors `SFREFS_CONFIG_PATH`, otherwise:
    /// - **Windows**: `%LOCALAPPDATA%\sfrefs\config.toml`
    /// - **Unix/macOS**: `~/.sfrefs/config.toml`
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or local data) directory cannot be
    /// determined.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join(CONFIG_DIR_NAME.trim_start_matches('.'))
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(CONFIG_DIR_NAME)
        };

        Ok(dir.join(CONFIG_FILE_NAME))
    }
}
