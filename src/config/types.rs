use crate::delivery::{DEFAULT_API_BASE, DEFAULT_EXCERPT_CHARS};
use crate::thread::ThreadRef;
use crate::ConfigError;
use serde::Deserialize;
use url::Url;

/// Main configuration structure for xf-mirror
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub forum: ForumConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    pub delivery: DeliveryConfig,
}

impl Config {
    /// Parsed forum base URL
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.forum.base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", self.forum.base_url, e))
        })
    }

    /// Parsed thread references, in configuration order
    pub fn thread_refs(&self) -> Result<Vec<ThreadRef>, ConfigError> {
        self.forum
            .threads
            .iter()
            .map(|t| ThreadRef::parse(t).map_err(ConfigError::from))
            .collect()
    }
}

/// Source forum configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ForumConfig {
    /// Forum root, e.g. `https://voz.vn`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Thread references (`slug.12345`) crawled on every tick
    pub threads: Vec<String>,
}

/// Crawler pacing and scheduling
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Minimum time between two page requests (milliseconds)
    #[serde(rename = "request-pause-ms", default = "default_request_pause_ms")]
    pub request_pause_ms: u64,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Time between two scheduled rounds (seconds)
    #[serde(rename = "interval-secs", default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_pause_ms: default_request_pause_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_request_pause_ms() -> u64 {
    3000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_interval_secs() -> u64 {
    300
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Persisted state location
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Where new posts are published
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryKind {
    Telegram,
    Stdout,
}

/// Delivery channel configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    pub kind: DeliveryKind,

    /// Telegram chat id or `@channel` name
    #[serde(rename = "chat-id", default)]
    pub chat_id: Option<String>,

    /// Telegram bot token
    #[serde(rename = "bot-token", default)]
    pub bot_token: Option<String>,

    #[serde(rename = "api-base", default = "default_api_base")]
    pub api_base: String,

    /// Maximum body length in a message (UTF-16 units, as Telegram counts)
    #[serde(rename = "excerpt-chars", default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_excerpt_chars() -> usize {
    DEFAULT_EXCERPT_CHARS
}
