//! Delivery module for publishing new posts
//!
//! This module handles:
//! - Formatting delivered posts as message text
//! - Publishing messages to Telegram through the Bot API
//! - Writing messages to stdout for local runs

mod format;
mod stdout;
mod telegram;
mod traits;

pub use format::{excerpt, MessageFormat, DEFAULT_EXCERPT_CHARS};
pub use stdout::StdoutSink;
pub use telegram::{TelegramSink, DEFAULT_API_BASE};
pub use traits::{DeliveryError, DeliveryResult, MessageSink, OutboundMessage};

use crate::config::{Config, DeliveryKind};
use crate::crawler::build_http_client;
use crate::{ConfigError, MirrorError};
use std::time::Duration;

/// Builds the sink selected by the configuration
///
/// # Returns
///
/// * `Ok(Box<dyn MessageSink>)` - Ready-to-use sink
/// * `Err(MirrorError)` - Missing credentials or unusable endpoint
pub fn build_sink(config: &Config) -> Result<Box<dyn MessageSink>, MirrorError> {
    let delivery = &config.delivery;
    match delivery.kind {
        DeliveryKind::Stdout => Ok(Box::new(StdoutSink)),
        DeliveryKind::Telegram => {
            let token = delivery.bot_token.as_deref().ok_or_else(|| {
                ConfigError::Validation("delivery.bot-token is required for telegram".to_string())
            })?;
            let chat_id = delivery.chat_id.as_deref().ok_or_else(|| {
                ConfigError::Validation("delivery.chat-id is required for telegram".to_string())
            })?;
            let client = build_http_client(
                &config.user_agent,
                Duration::from_secs(config.crawler.request_timeout_secs),
            )?;
            let sink = TelegramSink::new(client, &delivery.api_base, token, chat_id)?;
            Ok(Box::new(sink))
        }
    }
}

/// Message format selected by the configuration
pub fn message_format(config: &Config) -> MessageFormat {
    MessageFormat {
        excerpt_chars: config.delivery.excerpt_chars,
    }
}
