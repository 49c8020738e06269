use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable overriding `delivery.bot-token`
pub const ENV_BOT_TOKEN: &str = "XF_MIRROR_BOT_TOKEN";

/// Environment variable overriding `delivery.chat-id`
pub const ENV_CHAT_ID: &str = "XF_MIRROR_CHAT_ID";

/// Loads and parses a configuration file from the given path
///
/// Secrets from the environment are applied before validation, so a file
/// without a bot token is valid as long as `XF_MIRROR_BOT_TOKEN` is set.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use xf_mirror::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Threads: {:?}", config.forum.threads);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;

    apply_env_overrides(&mut config);
    validate(&config)?;

    Ok(config)
}

/// Applies overrides from the process environment
pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

/// Applies overrides from an arbitrary key lookup
///
/// Empty values are ignored.
pub fn apply_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(token) = lookup(ENV_BOT_TOKEN) {
        config.delivery.bot_token = Some(token);
    }
    if let Some(chat_id) = lookup(ENV_CHAT_ID) {
        config.delivery.chat_id = Some(chat_id);
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so a changed configuration is visible in the logs.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
