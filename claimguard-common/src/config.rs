//! Configuration loading and resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not fatal: a warning is logged and defaults are used.
//! A TOML file that exists but cannot be parsed is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "CLAIMGUARD_CONFIG";
/// Environment variable overriding the scoring service base URL
pub const SERVICE_URL_ENV: &str = "CLAIMGUARD_SERVICE_URL";
/// Environment variable overriding the analysis request timeout (seconds)
pub const REQUEST_TIMEOUT_ENV: &str = "CLAIMGUARD_REQUEST_TIMEOUT_SECS";
/// Environment variable overriding the object storage endpoint
pub const STORAGE_ENDPOINT_ENV: &str = "CLAIMGUARD_STORAGE_ENDPOINT";

const DEFAULT_SERVICE_URL: &str = "http://localhost:8000";
const DEFAULT_ANALYZE_PATH: &str = "/process";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_STORAGE_TIMEOUT_SECS: u64 = 60;

/// Client configuration
///
/// Every field has a compiled default, so an empty TOML file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the fraud-scoring service
    pub service_url: String,
    /// Path of the multipart analysis endpoint, relative to `service_url`
    pub analyze_path: String,
    /// Timeout for the single analysis request
    pub request_timeout_secs: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Object storage settings; `None` disables asset archival
    pub storage: Option<StorageConfig>,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            analyze_path: DEFAULT_ANALYZE_PATH.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: format!("ClaimGuard/{}", env!("CARGO_PKG_VERSION")),
            storage: None,
            logging: LoggingConfig::default(),
        }
    }
}

/// Object storage gateway settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Endpoint that accepts `PUT {endpoint}/{key}` and `DELETE {endpoint}/{key}`
    pub endpoint: String,
    /// Base of the publicly resolvable URL returned for each key.
    /// Defaults to `endpoint` when absent.
    pub public_base_url: Option<String>,
    /// Optional bucket segment inserted between endpoint and key
    pub bucket: Option<String>,
    /// Timeout for each put/delete call
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            public_base_url: None,
            bucket: None,
            timeout_secs: DEFAULT_STORAGE_TIMEOUT_SECS,
        }
    }
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Full URL of the analysis endpoint
    pub fn analyze_url(&self) -> String {
        join_url(&self.service_url, &self.analyze_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse a TOML config file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Apply environment variable overrides on top of file/default values
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = non_empty_env(SERVICE_URL_ENV) {
            debug!(service_url = %url, "Service URL overridden from environment");
            self.service_url = url;
        }

        if let Some(raw) = non_empty_env(REQUEST_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.request_timeout_secs = secs,
                Err(e) => warn!(
                    value = %raw,
                    error = %e,
                    "Ignoring invalid {}", REQUEST_TIMEOUT_ENV
                ),
            }
        }

        if let Some(endpoint) = non_empty_env(STORAGE_ENDPOINT_ENV) {
            let storage = self.storage.get_or_insert_with(StorageConfig::default);
            storage.endpoint = endpoint;
        }
    }

    /// Reject values that cannot produce a working client
    pub fn validate(&self) -> Result<()> {
        if !is_http_url(&self.service_url) {
            return Err(Error::Config(format!(
                "service_url must be an absolute http(s) URL, got '{}'",
                self.service_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if let Some(storage) = &self.storage {
            if !is_http_url(&storage.endpoint) {
                return Err(Error::Config(format!(
                    "storage.endpoint must be an absolute http(s) URL, got '{}'",
                    storage.endpoint
                )));
            }
            if storage.timeout_secs == 0 {
                return Err(Error::Config(
                    "storage.timeout_secs must be greater than zero".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Resolves which config file to read
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Config file path by priority: CLI → ENV → platform default
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }
        if let Some(path) = non_empty_env(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        default_config_path()
    }

    /// Load, override, and validate the configuration
    pub fn load(&self) -> Result<ClientConfig> {
        let mut config = match self.config_path() {
            Some(path) if path.exists() => {
                let config = ClientConfig::from_toml_file(&path)?;
                info!("Configuration loaded from {}", path.display());
                config
            }
            Some(path) => {
                warn!(
                    "Config file not found at {}, using defaults",
                    path.display()
                );
                ClientConfig::default()
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                ClientConfig::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

/// Platform config file location: `<config_dir>/claimguard/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("claimguard").join("config.toml"))
}

/// Write config as TOML via temp file + rename
pub fn write_toml_config(config: &ClientConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Join a base URL and a path with exactly one separating slash
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, path)
    }
}

fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    (value.starts_with("http://") && value.len() > "http://".len())
        || (value.starts_with("https://") && value.len() > "https://".len())
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
