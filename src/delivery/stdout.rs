//! Stdout sink, for local runs without a channel

use crate::delivery::traits::{DeliveryResult, MessageSink, OutboundMessage};
use async_trait::async_trait;
use std::io::Write;

/// Writes each message to stdout followed by a separator line
#[derive(Debug, Default)]
pub struct StdoutSink;

#[async_trait]
impl MessageSink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn publish(&self, message: &OutboundMessage) -> DeliveryResult<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}\n---", message.text)?;
        out.flush()?;
        Ok(())
    }
}
