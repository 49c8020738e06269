//! Configuration module for xf-mirror
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Telegram credentials may be supplied through the environment instead of the file.
//!
//! # Example
//!
//! ```no_run
//! use xf_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Polling every {}s", config.crawler.interval_secs);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CrawlerConfig, DeliveryConfig, DeliveryKind, ForumConfig, StorageConfig,
    UserAgentConfig,
};

pub use parser::{
    apply_env_overrides, apply_overrides, compute_config_hash, load_config,
    load_config_with_hash, ENV_BOT_TOKEN, ENV_CHAT_ID,
};
