//! Application configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream social-graph API configuration.
    #[serde(default)]
    pub neynar: NeynarConfig,
    /// Feed and search behaviour.
    #[serde(default)]
    pub feed: FeedConfig,
    /// Deleted-cast unlock configuration.
    #[serde(default)]
    pub unlock: UnlockConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Neynar (Farcaster) API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NeynarConfig {
    /// Base URL of the v2 Farcaster API.
    #[serde(default = "default_neynar_base_url")]
    pub base_url: String,
    /// API key. When absent the server runs against the bundled demo graph.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// How many recent casts to scan per author when building a conversation.
    #[serde(default = "default_casts_per_user")]
    pub casts_per_user: usize,
    /// How many recent casts to scan when ranking trending pairs.
    #[serde(default = "default_trending_window")]
    pub trending_window: usize,
}

/// Feed and search configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Trending pairs returned when the caller gives no limit.
    #[serde(default = "default_trending_limit")]
    pub trending_default_limit: usize,
    /// Upper bound on trending pairs per request.
    #[serde(default = "default_trending_max_limit")]
    pub trending_max_limit: usize,
    /// Quiet interval before a search keystroke triggers a lookup.
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
}

/// Unlock configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UnlockConfig {
    /// Fee charged per unlock, in cents.
    #[serde(default = "default_fee_cents")]
    pub fee_cents: u32,
    /// Fee currency.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// JSON file mapping cast hashes to their archived text.
    #[serde(default)]
    pub archive_path: Option<PathBuf>,
    /// Make the simulated payment processor decline every charge.
    #[serde(default)]
    pub decline_all: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

fn default_neynar_base_url() -> String {
    "https://api.neynar.com/v2/farcaster".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_casts_per_user() -> usize {
    150
}

const fn default_trending_window() -> usize {
    100
}

const fn default_trending_limit() -> usize {
    10
}

const fn default_trending_max_limit() -> usize {
    50
}

const fn default_search_debounce_ms() -> u64 {
    300
}

const fn default_fee_cents() -> u32 {
    1
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for NeynarConfig {
    fn default() -> Self {
        Self {
            base_url: default_neynar_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            casts_per_user: default_casts_per_user(),
            trending_window: default_trending_window(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            trending_default_limit: default_trending_limit(),
            trending_max_limit: default_trending_max_limit(),
            search_debounce_ms: default_search_debounce_ms(),
        }
    }
}

impl Default for UnlockConfig {
    fn default() -> Self {
        Self {
            fee_cents: default_fee_cents(),
            currency: default_currency(),
            archive_path: None,
            decline_all: false,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `SUBCAST_ENV`)
    /// 4. Environment variables with `SUBCAST__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        // A missing .env file is the normal case outside development.
        let _ = dotenvy::dotenv();

        let env = std::env::var("SUBCAST_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("SUBCAST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("SUBCAST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Whether a real upstream API key is configured.
    #[must_use]
    pub fn has_upstream(&self) -> bool {
        self.neynar
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}
