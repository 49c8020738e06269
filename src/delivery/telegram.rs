//! Telegram Bot API sink
//!
//! Publishes each message with `sendMessage` to a fixed chat (a channel
//! username like `@news` or a numeric chat id). Messages are sent as plain
//! text so forum markup in post bodies can never break formatting.

use crate::delivery::traits::{DeliveryError, DeliveryResult, MessageSink, OutboundMessage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

/// Default Bot API endpoint
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sink posting to a Telegram chat through a bot
///
/// Not `Debug`: the endpoint URL embeds the bot token.
pub struct TelegramSink {
    client: Client,
    endpoint: Url,
    chat_id: String,
}

impl TelegramSink {
    /// Creates a sink for `chat_id` using the bot identified by `bot_token`
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client to send requests with
    /// * `api_base` - Bot API base URL, normally [`DEFAULT_API_BASE`]
    /// * `bot_token` - The bot's secret token
    /// * `chat_id` - Target chat
    pub fn new(
        client: Client,
        api_base: &str,
        bot_token: &str,
        chat_id: &str,
    ) -> DeliveryResult<Self> {
        Url::parse(api_base)
            .map_err(|e| DeliveryError::InvalidEndpoint(format!("{}: {}", api_base, e)))?;

        // Tokens look like `123456:ABC-DEF`, which a relative join would read as a scheme
        let endpoint = Url::parse(&format!(
            "{}/bot{}/sendMessage",
            api_base.trim_end_matches('/'),
            bot_token
        ))
        .map_err(|_| DeliveryError::InvalidEndpoint("malformed bot token".to_string()))?;

        Ok(Self {
            client,
            endpoint,
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait]
impl MessageSink for TelegramSink {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn publish(&self, message: &OutboundMessage) -> DeliveryResult<()> {
        let request = SendMessage {
            chat_id: &self.chat_id,
            text: &message.text,
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<ApiReply>(&body) {
            Ok(reply) if reply.ok && status.is_success() => Ok(()),
            Ok(reply) => Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: reply
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            }),
            Err(_) => Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: format!(
                    "unexpected reply: {}",
                    body.chars().take(200).collect::<String>()
                ),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> OutboundMessage {
        OutboundMessage {
            thread_id: 10,
            post_id: 101,
            text: "Thread #10\nhello".to_string(),
        }
    }

    #[tokio::test]
    async fn test_publish_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST:TOKEN/sendMessage"))
            .and(body_json(serde_json::json!({
                "chat_id": "@mirror",
                "text": "Thread #10\nhello",
                "disable_web_page_preview": true
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ok": true, "result": {"message_id": 1}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let sink =
            TelegramSink::new(Client::new(), &server.uri(), "TEST:TOKEN", "@mirror").unwrap();
        sink.publish(&message()).await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: chat not found"
            })))
            .mount(&server)
            .await;

        let sink = TelegramSink::new(Client::new(), &server.uri(), "T", "@missing").unwrap();
        let err = sink.publish(&message()).await.unwrap_err();
        match err {
            DeliveryError::Rejected {
                status,
                description,
            } => {
                assert_eq!(status, 400);
                assert!(description.contains("chat not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_publish_non_json_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let sink = TelegramSink::new(Client::new(), &server.uri(), "T", "@c").unwrap();
        assert!(matches!(
            sink.publish(&message()).await,
            Err(DeliveryError::Rejected { status: 502, .. })
        ));
    }

    #[test]
    fn test_invalid_api_base() {
        assert!(matches!(
            TelegramSink::new(Client::new(), "not a url", "T", "@c"),
            Err(DeliveryError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_numeric_token_is_not_read_as_scheme() {
        let sink = TelegramSink::new(
            Client::new(),
            "https://api.telegram.org/",
            "123456:ABC-DEF",
            "@c",
        )
        .unwrap();
        assert_eq!(
            sink.endpoint.as_str(),
            "https://api.telegram.org/bot123456:ABC-DEF/sendMessage"
        );
    }
}
