//! Configuration for a backup run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.smugmug.com";

/// Download behaviour for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Number of concurrent file downloads.
    pub concurrent_downloads: usize,
    /// Whether to overwrite existing files.
    pub force_overwrite: bool,
    /// Whether to clean up `.part` files on download error.
    pub cleanup_on_error: bool,
    /// Whether to resolve videos even while the server is still processing them.
    pub force_video_download: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            concurrent_downloads: 4,
            force_overwrite: false,
            cleanup_on_error: true,
            force_video_download: false,
        }
    }
}

impl DownloadConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of concurrent file downloads.
    #[must_use]
    pub const fn with_concurrent_downloads(mut self, concurrent: usize) -> Self {
        self.concurrent_downloads = concurrent;
        self
    }

    /// Sets whether to force overwrite existing files.
    #[must_use]
    pub const fn with_force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    /// Sets whether to clean up `.part` files on download error.
    #[must_use]
    pub const fn with_cleanup_on_error(mut self, cleanup: bool) -> Self {
        self.cleanup_on_error = cleanup;
        self
    }

    /// Sets whether videos still being processed are downloaded anyway.
    #[must_use]
    pub const fn with_force_video_download(mut self, force: bool) -> Self {
        self.force_video_download = force;
        self
    }
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Account whose albums are backed up.
    pub username: String,
    /// Scheme and host that relative API URIs are resolved against.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Optional cap on pages fetched by a single enumeration.
    pub max_pages: Option<usize>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 60,
            max_pages: None,
        }
    }
}

/// Pre-computed credentials. Signing requests is left to whoever produces the header.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Value sent verbatim in the `Authorization` header.
    pub authorization: Option<String>,
}

/// Local storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root folder that album folders are created under.
    pub destination: PathBuf,
    /// Filename template, see [`FilenameTemplate`](crate::media::FilenameTemplate).
    pub file_names: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            destination: PathBuf::new(),
            file_names: "{FileName}".to_string(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// API settings.
    pub api: ApiConfig,
    /// Credentials.
    pub auth: AuthConfig,
    /// Storage settings.
    pub store: StoreConfig,
    /// Download settings.
    pub download: DownloadConfig,
}

impl AppConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the default config file location.
    ///
    /// Uses `SMUGMUG_BACKUP_CONFIG` when set, falling back to
    /// `$XDG_CONFIG_HOME/smugmug-backup/config.toml`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        Self::resolve_path(None, |key| std::env::var(key).ok())
    }

    /// Picks the config file: `SMUGMUG_BACKUP_CONFIG`, then `cli_path`, then
    /// the user config directory.
    #[must_use]
    pub fn resolve_path(
        cli_path: Option<PathBuf>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> PathBuf {
        lookup("SMUGMUG_BACKUP_CONFIG")
            .map(PathBuf::from)
            .or(cli_path)
            .unwrap_or_else(|| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("smugmug-backup")
                    .join("config.toml")
            })
    }

    /// Parses a configuration from TOML text and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the text is not valid TOML or a required
    /// field is missing.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration file at `path`, applies environment
    /// overrides and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the configuration is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let mut config: Self =
            toml::from_str(&contents).map_err(|e| Error::Config(e.to_string()))?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Replaces file values with `SMUGMUG_*` environment variables that are set.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(username) = lookup("SMUGMUG_USERNAME") {
            self.api.username = username;
        }
        if let Some(destination) = lookup("SMUGMUG_DESTINATION") {
            self.store.destination = PathBuf::from(destination);
        }
        if let Some(authorization) = lookup("SMUGMUG_AUTHORIZATION") {
            self.auth.authorization = Some(authorization);
        }
    }

    /// Checks that required settings are present and sane.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.api.username.trim().is_empty() {
            return Err(Error::Config("api.username is required".to_string()));
        }
        if self.store.destination.as_os_str().is_empty() {
            return Err(Error::Config("store.destination is required".to_string()));
        }
        if self.download.concurrent_downloads == 0 {
            return Err(Error::Config(
                "download.concurrent_downloads must be at least 1".to_string(),
            ));
        }
        if self.api.max_pages == Some(0) {
            return Err(Error::Config("api.max_pages must be at least 1".to_string()));
        }
        crate::media::FilenameTemplate::parse(&self.store.file_names)?;
        Ok(())
    }
}
