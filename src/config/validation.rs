use crate::config::types::{
    Config, CrawlerConfig, DeliveryConfig, DeliveryKind, ForumConfig, StorageConfig,
    UserAgentConfig,
};
use crate::thread::ThreadRef;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Upper bound for `excerpt-chars`; Telegram caps a message at 4096 UTF-16 units
const MAX_EXCERPT_CHARS: usize = 3500;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_forum_config(&config.forum)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_delivery_config(&config.delivery)?;
    Ok(())
}

/// Validates the forum base URL and thread list
fn validate_forum_config(config: &ForumConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::Validation(format!(
            "base-url '{}' cannot carry a query or fragment",
            config.base_url
        )));
    }

    if config.threads.is_empty() {
        return Err(ConfigError::Validation(
            "forum.threads must list at least one thread".to_string(),
        ));
    }

    // Two entries for one thread id would run overlapping passes on one watermark
    let mut seen = HashSet::new();
    for reference in &config.threads {
        let thread = ThreadRef::parse(reference)?;
        if !seen.insert(thread.id()) {
            return Err(ConfigError::Validation(format!(
                "Thread {} is listed more than once",
                thread.id()
            )));
        }
    }

    Ok(())
}

/// Validates crawler timings
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.request_pause_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_pause_ms must be >= 100ms, got {}ms",
            config.request_pause_ms
        )));
    }

    if config.request_timeout_secs < 1 || config.request_timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be between 1 and 300, got {}",
            config.request_timeout_secs
        )));
    }

    if config.interval_secs < 10 {
        return Err(ConfigError::Validation(format!(
            "interval_secs must be >= 10, got {}",
            config.interval_secs
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates delivery settings; credentials are checked after env overrides
fn validate_delivery_config(config: &DeliveryConfig) -> Result<(), ConfigError> {
    if config.excerpt_chars == 0 || config.excerpt_chars > MAX_EXCERPT_CHARS {
        return Err(ConfigError::Validation(format!(
            "excerpt_chars must be between 1 and {}, got {}",
            MAX_EXCERPT_CHARS, config.excerpt_chars
        )));
    }

    if config.kind == DeliveryKind::Telegram {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

        if !present(&config.bot_token) {
            return Err(ConfigError::Validation(
                "telegram delivery needs bot-token (or XF_MIRROR_BOT_TOKEN)".to_string(),
            ));
        }
        if !present(&config.chat_id) {
            return Err(ConfigError::Validation(
                "telegram delivery needs chat-id (or XF_MIRROR_CHAT_ID)".to_string(),
            ));
        }

        Url::parse(&config.api_base)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid api-base: {}", e)))?;
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ThreadRefError;

    fn valid_config() -> Config {
        toml::from_str(
            r#"
[forum]
base-url = "https://forum.example.com"
threads = ["topic.10"]

[user-agent]
crawler-name = "xf-mirror"
crawler-version = "1.0.0"
contact-url = "https://example.com/about"
contact-email = "ops@example.com"

[storage]
database-path = "./mirror.db"

[delivery]
kind = "telegram"
chat-id = "@news"
bot-token = "123:abc"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_base_url_must_be_http() {
        let mut config = valid_config();
        config.forum.base_url = "ftp://forum.example.com".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        config.forum.base_url = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_bad_thread_reference_is_rejected() {
        let mut config = valid_config();
        config.forum.threads = vec!["no-id-here".to_string()];
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidThread(ThreadRefError::MissingId(_)))
        ));
    }

    #[test]
    fn test_duplicate_thread_is_rejected() {
        let mut config = valid_config();
        config.forum.threads = vec!["topic.10".to_string(), "renamed-topic.10".to_string()];
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_timing_bounds() {
        let mut config = valid_config();
        config.crawler.request_pause_ms = 50;
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config.crawler.request_timeout_secs = 0;
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config.crawler.request_timeout_secs = 301;
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config.crawler.interval_secs = 5;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_telegram_requires_credentials() {
        let mut config = valid_config();
        config.delivery.bot_token = None;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        let mut config = valid_config();
        config.delivery.chat_id = Some("   ".to_string());
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_stdout_needs_no_credentials() {
        let mut config = valid_config();
        config.delivery.kind = DeliveryKind::Stdout;
        config.delivery.bot_token = None;
        config.delivery.chat_id = None;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_excerpt_bounds() {
        let mut config = valid_config();
        config.delivery.excerpt_chars = 0;
        assert!(validate(&config).is_err());

        config.delivery.excerpt_chars = MAX_EXCERPT_CHARS + 1;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
        assert!(validate_email("a@b@example.com").is_err());
    }
}
