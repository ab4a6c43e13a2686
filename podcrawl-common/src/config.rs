//! Configuration loading and config file resolution
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `PODCRAWL_CONFIG` environment variable
//! 3. `<config_dir>/podcrawl/podcrawl.toml`
//! 4. Compiled defaults (fallback)
//!
//! A missing config file never stops startup: a warning is logged and the
//! compiled defaults are used. A file that exists but cannot be read or
//! parsed is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PODCRAWL_CONFIG";

/// Lookup endpoint template; the show identifier is appended
pub const DEFAULT_LOOKUP_ENDPOINT: &str = "https://itunes.apple.com/lookup?id=";

/// Anchor hrefs on a category page that point at a show
pub const DEFAULT_LINK_PATTERN: &str =
    r"^https?://(?:itunes|podcasts)\.apple\.com/.*podcast/.*id\d+";

/// Element id of the block holding the show list on a category page
pub const DEFAULT_CONTAINER_ID: &str = "selectedcontent";

const DEFAULT_USER_AGENT: &str = concat!("podcrawl/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Bootstrap configuration loaded from TOML file
///
/// Every section is optional; absent keys fall back to compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Lookup endpoint configuration
    #[serde(default)]
    pub lookup: LookupConfig,

    /// Category page discovery configuration
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Lookup endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Endpoint template the identifier is appended to
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in seconds (0 = wait indefinitely)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum lookups in flight at once (0 = unbounded)
    #[serde(default)]
    pub max_concurrent: usize,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl LookupConfig {
    /// Per-request timeout, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Concurrency bound, `None` when unbounded
    pub fn concurrency_limit(&self) -> Option<usize> {
        match self.max_concurrent {
            0 => None,
            n => Some(n),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            max_concurrent: 0,
            user_agent: default_user_agent(),
        }
    }
}

/// Category page discovery configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Regular expression an anchor href must match to count as a show link
    #[serde(default = "default_link_pattern")]
    pub pattern: String,

    /// Only links inside the `<div>` with this id count (empty = whole page)
    #[serde(default = "default_container_id")]
    pub container_id: String,
}

impl DiscoveryConfig {
    /// Container id, `None` when the whole page is scanned
    pub fn container(&self) -> Option<&str> {
        match self.container_id.trim() {
            "" => None,
            id => Some(id),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            pattern: default_link_pattern(),
            container_id: default_container_id(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_endpoint() -> String {
    DEFAULT_LOOKUP_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_link_pattern() -> String {
    DEFAULT_LINK_PATTERN.to_string()
}

fn default_container_id() -> String {
    DEFAULT_CONTAINER_ID.to_string()
}

/// Resolves which config file to load
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Pick the config file path by priority, `None` when no candidate exists
    pub fn resolve(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        default_config_path().filter(|p| p.exists())
    }

    /// Resolve and load the configuration, degrading to defaults when absent
    pub fn load(&self) -> Result<TomlConfig> {
        match self.resolve() {
            Some(path) if path.exists() => {
                let config = load_toml_config(&path)?;
                info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using compiled defaults",
                    path.display()
                );
                Ok(TomlConfig::default())
            }
            None => {
                info!("No config file found, using compiled defaults");
                Ok(TomlConfig::default())
            }
        }
    }
}

/// Platform config file location (`~/.config/podcrawl/podcrawl.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("podcrawl").join("podcrawl.toml"))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Write a config file, creating parent directories as needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    // Write to a sibling temp file first so readers never see a partial file
    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;

    Ok(())
}
