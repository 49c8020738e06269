//! xf-mirror: incremental forum thread mirroring
//!
//! This crate follows a paginated XenForo discussion thread and republishes
//! every newly appeared post to a message channel. A per-thread watermark
//! (last page scanned, highest post id seen) is persisted between runs so each
//! pass only emits posts that were not delivered before.

pub mod config;
pub mod crawler;
pub mod delivery;
pub mod state;
pub mod storage;
pub mod thread;

use thiserror::Error;

/// Main error type for xf-mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid thread reference: {0}")]
    ThreadRef(#[from] ThreadRefError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] delivery::DeliveryError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

impl MirrorError {
    /// Returns true if the persisted-state backend could not be reached
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_unavailable())
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid thread reference in config: {0}")]
    InvalidThread(#[from] ThreadRefError),
}

/// Thread reference errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThreadRefError {
    #[error("Thread reference is empty")]
    Empty,

    #[error("Thread reference '{0}' has no numeric thread id")]
    MissingId(String),

    #[error("Thread reference '{0}' contains invalid characters")]
    InvalidCharacters(String),

    #[error("Page numbers start at 1, got {0}")]
    InvalidPage(u32),

    #[error("Failed to build page URL: {0}")]
    Url(String),
}

/// Result type alias for xf-mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for thread reference operations
pub type ThreadRefResult<T> = std::result::Result<T, ThreadRefError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Controller, CrawlOutcome, PassReport};
pub use state::{PageResult, Post, ThreadWatermark};
pub use thread::ThreadRef;
