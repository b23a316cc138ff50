//! Configuration management.
//!
//! Settings come from, in increasing priority: built-in defaults, a config
//! file, `ARXIV_HARVEST_*` environment variables and finally CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! keywords = ["all:TFET", "all:Tunnel FET"]
//! page_size = 1000
//! start = 0
//! # total = 2500
//! delay_seconds = 3.0
//! base_url = "http://export.arxiv.org/api/query"
//! timeout_seconds = 30
//! connect_timeout_seconds = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sources::ARXIV_API_URL;
use crate::utils::DEFAULT_USER_AGENT;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "ARXIV_HARVEST";

/// File name searched for by [`find_config_file`]
pub const CONFIG_FILE_NAME: &str = "arxiv-harvest.toml";

/// Harvest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Keyword terms, OR-combined
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Results requested per page
    #[serde(default = "default_page_size")]
    pub page_size: i64,

    /// Offset of the first result
    #[serde(default)]
    pub start: i64,

    /// Explicit total; discovered from the feed when unset
    #[serde(default)]
    pub total: Option<i64>,

    /// Fair-use delay between requests, in seconds
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: f64,

    /// API endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            page_size: default_page_size(),
            start: 0,
            total: None,
            delay_seconds: default_delay_seconds(),
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
            user_agent: default_user_agent(),
        }
    }
}

impl HarvestConfig {
    /// Fair-use delay as a duration; negative or non-finite values mean no delay
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_seconds).unwrap_or(Duration::ZERO)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

fn default_page_size() -> i64 {
    1000
}

fn default_delay_seconds() -> f64 {
    3.0
}

fn default_base_url() -> String {
    ARXIV_API_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_connect_timeout_seconds() -> u64 {
    10
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<HarvestConfig, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(env_source())
        .build()?;

    settings.try_deserialize()
}

/// Get the configuration from environment variables and defaults only
pub fn get_config() -> Result<HarvestConfig, config::ConfigError> {
    config::Config::builder()
        .add_source(env_source())
        .build()?
        .try_deserialize()
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("keywords")
}

/// Find a config file in the working directory or the user config directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("arxiv-harvest").join("config.toml"))
        .filter(|path| path.is_file())
}
