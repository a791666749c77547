//! Layered configuration.
//!
//! Resolution order: `STARCHAT_*` environment variables over the TOML
//! config file (`~/.config/starchat/config.toml`, a missing file is not
//! an error) over compiled defaults. This core is embedded in a UI, so
//! there is no command-line layer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::gate::GateConfig;
use crate::realtime::WsRealtime;
use crate::rest::{ClientError, DirectStoreClient, RestAuthClient, RestClient};

/// Error loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("cannot read config file {path}: {source}")]
    Io {
        /// The file that failed to read.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The config file could not be parsed.
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        /// The file that failed to parse.
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend endpoints and credentials.
    pub api: ApiConfig,
    /// Verification gate tuning.
    pub gate: GateSection,
    /// Sync channel tuning.
    pub sync: SyncSection,
    /// Local storage location.
    pub storage: StorageSection,
    /// Logging setup.
    pub log: LogSection,
}

/// Backend endpoints and credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the structured REST API.
    pub rest_url: String,
    /// Base URL of the direct data-store insert endpoint.
    pub direct_url: String,
    /// Base URL of the auth backend.
    pub auth_url: String,
    /// WebSocket URL of the realtime provider.
    pub realtime_url: String,
    /// API key sent with every request.
    pub api_key: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            rest_url: "http://127.0.0.1:8080/rest".to_string(),
            direct_url: "http://127.0.0.1:8081".to_string(),
            auth_url: "http://127.0.0.1:8080".to_string(),
            realtime_url: "ws://127.0.0.1:8082/realtime".to_string(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

impl ApiConfig {
    /// The configured per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Builds the structured REST client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the base URL is invalid.
    pub fn rest_client(&self) -> Result<RestClient, ClientError> {
        RestClient::new(Url::parse(&self.rest_url)?, self.api_key.clone(), self.timeout())
    }

    /// Builds the direct data-store client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the base URL is invalid.
    pub fn direct_client(&self) -> Result<DirectStoreClient, ClientError> {
        DirectStoreClient::new(
            Url::parse(&self.direct_url)?,
            self.api_key.clone(),
            self.timeout(),
        )
    }

    /// Builds the auth client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the base URL is invalid.
    pub fn auth_client(&self) -> Result<RestAuthClient, ClientError> {
        RestAuthClient::new(
            Url::parse(&self.auth_url)?,
            self.api_key.clone(),
            self.timeout(),
        )
    }

    /// Builds the realtime provider.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the realtime URL is invalid.
    pub fn realtime(&self) -> Result<WsRealtime, ClientError> {
        Ok(WsRealtime::new(Url::parse(&self.realtime_url)?))
    }
}

/// Verification gate tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSection {
    /// Resend cooldown in seconds.
    pub cooldown_secs: u32,
    /// Wall-clock milliseconds per countdown second.
    pub tick_ms: u64,
}

impl Default for GateSection {
    fn default() -> Self {
        Self {
            cooldown_secs: 60,
            tick_ms: 1000,
        }
    }
}

impl GateSection {
    /// The gate configuration this section describes.
    #[must_use]
    pub const fn gate_config(&self) -> GateConfig {
        GateConfig {
            cooldown_secs: self.cooldown_secs,
            tick: Duration::from_millis(self.tick_ms),
        }
    }
}

/// Sync channel tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    /// Capacity of the room event channel.
    pub event_buffer: usize,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self { event_buffer: 256 }
    }
}

/// Local storage location.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Storage directory; defaults to the platform data directory.
    pub dir: Option<PathBuf>,
}

impl StorageSection {
    /// The effective storage directory.
    #[must_use]
    pub fn resolve(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("starchat")
        })
    }
}

/// Logging setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log filter, `EnvFilter` syntax.
    pub level: String,
    /// Log file path; stderr when unset.
    pub file: Option<PathBuf>,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// The default config file location.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("starchat").join("config.toml"))
    }

    /// Loads the configuration from `path` (or the default location),
    /// then applies environment overrides. A missing file yields the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = path.map_or_else(Self::default_path, |p| Some(p.to_path_buf()));
        let mut config = match resolved {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env_from(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `STARCHAT_*` overrides from an environment lookup.
    pub fn apply_env_from(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(value) = get("STARCHAT_REST_URL") {
            self.api.rest_url = value;
        }
        if let Some(value) = get("STARCHAT_DIRECT_URL") {
            self.api.direct_url = value;
        }
        if let Some(value) = get("STARCHAT_AUTH_URL") {
            self.api.auth_url = value;
        }
        if let Some(value) = get("STARCHAT_REALTIME_URL") {
            self.api.realtime_url = value;
        }
        if let Some(value) = get("STARCHAT_API_KEY") {
            self.api.api_key = value;
        }
        if let Some(value) = get("STARCHAT_LOG") {
            self.log.level = value;
        }
        if let Some(value) = get("STARCHAT_STORAGE_DIR") {
            self.storage.dir = Some(PathBuf::from(value));
        }
        if let Some(value) = get("STARCHAT_COOLDOWN_SECS") {
            match value.parse() {
                Ok(secs) => self.gate.cooldown_secs = secs,
                Err(_) => {
                    tracing::warn!(value, "ignoring unparseable STARCHAT_COOLDOWN_SECS");
                }
            }
        }
    }
}
