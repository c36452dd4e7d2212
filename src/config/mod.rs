//! Configuration, read from `~/.config/swipefeed/config.toml` at startup.
//!
//! If the file doesn't exist, a default configuration with comments is
//! created. Missing fields fall back to their defaults.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use serde::Deserialize;

use crate::fetcher::{ProxyEndpoint, DEFAULT_TIMEOUT_SECS};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub refresh: RefreshConfig,
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,
    /// Route fetches through the proxy fallback chain instead of fetching
    /// directly. Needed on platforms without cross-origin fetch.
    pub use_proxies: bool,
    /// Ordered relay chain; empty means the built-in defaults.
    pub proxies: Vec<ProxyConfig>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            use_proxies: false,
            proxies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Prefix the percent-encoded target URL is appended to.
    pub prefix: String,
    /// JSON envelope field holding the document, or absent for raw relays.
    pub json_field: Option<String>,
}

impl From<&ProxyConfig> for ProxyEndpoint {
    fn from(p: &ProxyConfig) -> Self {
        ProxyEndpoint {
            prefix: p.prefix.clone(),
            json_field: p.json_field.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Feeds refreshed concurrently per batch during bulk refresh.
    pub batch_width: usize,
    /// Minutes between automatic refreshes in watch mode.
    pub auto_update_interval_mins: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            batch_width: crate::engine::DEFAULT_BATCH_WIDTH,
            auto_update_interval_mins: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Articles older than this are eligible for cleanup (bookmarks exempt).
    pub days_to_keep: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            days_to_keep: crate::engine::DEFAULT_RETENTION_DAYS,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        Ok(config)
    }

    /// `~/.config/swipefeed/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("swipefeed").join("config.toml"))
    }

    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        r##"# SwipeFeed Configuration

[fetch]
# Per-attempt fetch timeout in seconds
timeout_secs = 10

# Route fetches through relay proxies (for environments without
# cross-origin fetch). Relays are tried in order until one succeeds.
use_proxies = false

# Custom relay chain. Leave empty to use the built-in defaults.
# [[fetch.proxies]]
# prefix = "https://api.allorigins.win/get?url="
# json_field = "contents"

[refresh]
# Feeds refreshed concurrently per batch during a bulk refresh
batch_width = 3

# Minutes between automatic refreshes in watch mode
auto_update_interval_mins = 30

[retention]
# Articles older than this many days are deleted by cleanup.
# Bookmarked articles are always kept.
days_to_keep = 30
"##
        .to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
