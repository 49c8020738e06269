//! Delivery sink traits and error types
//!
//! This module defines the trait interface for outbound message channels and
//! associated error types.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while publishing a message
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Delivery request failed: {0}")]
    Http(reqwest::Error),

    #[error("Channel rejected message (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },

    #[error("Invalid delivery endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(error: reqwest::Error) -> Self {
        // Request URLs can embed credentials (the bot token)
        Self::Http(error.without_url())
    }
}

/// Result type for delivery operations
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// One formatted post, ready to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Thread the post belongs to
    pub thread_id: i64,

    /// The delivered post's id
    pub post_id: i64,

    /// Complete message text
    pub text: String,
}

/// An outbound message channel
///
/// Messages are handed over one at a time, in delivery order.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Publishes one message
    async fn publish(&self, message: &OutboundMessage) -> DeliveryResult<()>;
}
