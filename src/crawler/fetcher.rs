//! HTTP page fetcher
//!
//! This module handles all HTTP requests to the forum, including:
//! - Building HTTP clients with an identifying user agent string
//! - Building page URLs from a thread reference and page number
//! - Pacing successive page requests
//! - Error classification and page parsing

use crate::config::{Config, UserAgentConfig};
use crate::crawler::pacer::RequestPacer;
use crate::crawler::parser::parse_thread_page;
use crate::state::PageResult;
use crate::thread::ThreadRef;
use crate::{MirrorError, ThreadRefError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use url::Url;

/// Errors reaching or reading one page
///
/// Any of these aborts the current pass without touching the watermark.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("HTML parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Cannot build page URL: {0}")]
    InvalidUrl(#[from] ThreadRefError),
}

/// Capability to fetch and parse one page of a thread
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches page `page` (1-based) of `thread`
    async fn fetch(&self, thread: &ThreadRef, page: u32) -> Result<PageResult, FetchError>;
}

/// Formats the identifying user agent string
///
/// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use xf_mirror::config::UserAgentConfig;
/// use xf_mirror::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "xf-mirror".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches thread pages over HTTP
pub struct HttpPageFetcher {
    client: Client,
    base_url: Url,
    pacer: Mutex<RequestPacer>,
}

impl HttpPageFetcher {
    /// Creates a fetcher for threads hosted under `base_url`
    pub fn new(client: Client, base_url: Url, min_pause: Duration) -> Self {
        Self {
            client,
            base_url,
            pacer: Mutex::new(RequestPacer::new(min_pause)),
        }
    }

    /// Builds a fetcher (and its HTTP client) from the configuration
    pub fn from_config(config: &Config) -> Result<Self, MirrorError> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.crawler.request_timeout_secs),
        )?;
        Ok(Self::new(
            client,
            config.base_url()?,
            Duration::from_millis(config.crawler.request_pause_ms),
        ))
    }

    /// The forum base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// GETs one page and returns its body
    async fn get_html(&self, url: &Url) -> Result<String, FetchError> {
        self.pacer.lock().await.wait_turn().await;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| classify_error(url, e))?;
        tracing::debug!("GET {} ({} bytes)", url, body.len());
        Ok(body)
    }
}

fn classify_error(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, thread: &ThreadRef, page: u32) -> Result<PageResult, FetchError> {
        let url = thread.page_url(&self.base_url, page)?;
        let html = self.get_html(&url).await?;

        parse_thread_page(&html, &url).map_err(|e| FetchError::Parse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestMirror".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    fn fetcher_for(server: &MockServer) -> HttpPageFetcher {
        let client = build_http_client(&create_test_config(), Duration::from_secs(5)).unwrap();
        HttpPageFetcher::new(
            client,
            Url::parse(&server.uri()).unwrap(),
            Duration::from_millis(10),
        )
    }

    fn thread_page(ids: &[i64], total_pages: Option<u32>) -> String {
        let posts: String = ids
            .iter()
            .map(|id| {
                format!(
                    r#"<article class="message" data-content="post-{id}">
                        <h4 class="message-name"><a data-user-id="1">user</a></h4>
                        <header class="message-attribution"><a href="/t/topic.10/post-{id}"><time data-time="1600000000"></time></a></header>
                        <article class="message-body"><div class="bbWrapper">post {id}</div></article>
                    </article>"#,
                    id = id
                )
            })
            .collect();
        let nav = total_pages
            .map(|n| format!(r#"<ul class="pageNav-main"><li><a>1</a></li><li><a>{}</a></li></ul>"#, n))
            .unwrap_or_default();
        format!("<html><body>{}{}</body></html>", nav, posts)
    }

    #[test]
    fn test_user_agent_format() {
        assert_eq!(
            user_agent_string(&create_test_config()),
            "TestMirror/1.0 (+https://example.com/about; admin@example.com)"
        );
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&create_test_config(), Duration::from_secs(30));
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_parses_page_and_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/t/topic.10/page-2"))
            .and(header(
                "user-agent",
                "TestMirror/1.0 (+https://example.com/about; admin@example.com)",
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(thread_page(&[151, 152], Some(3)))
                    .insert_header("content-type", "text/html"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server);
        let thread = ThreadRef::parse("topic.10").unwrap();
        let result = fetcher.fetch(&thread, 2).await.unwrap();

        let ids: Vec<i64> = result.posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![151, 152]);
        assert_eq!(result.total_pages, 3);
        assert_eq!(
            result.posts[0].permalink,
            format!("{}/t/topic.10/post-151", server.uri())
        );
    }

    #[tokio::test]
    async fn test_consecutive_fetches_are_paced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(thread_page(&[1], None)))
            .expect(2)
            .mount(&server)
            .await;

        let client = build_http_client(&create_test_config(), Duration::from_secs(5)).unwrap();
        let fetcher = HttpPageFetcher::new(
            client,
            Url::parse(&server.uri()).unwrap(),
            Duration::from_millis(300),
        );
        let thread = ThreadRef::parse("topic.10").unwrap();

        let start = std::time::Instant::now();
        fetcher.fetch(&thread, 1).await.unwrap();
        fetcher.fetch(&thread, 2).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_fetch_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server);
        let thread = ThreadRef::parse("topic.10").unwrap();
        let err = fetcher.fetch(&thread, 1).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_fetch_unparseable_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><body>maintenance</body></html>"),
            )
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server);
        let thread = ThreadRef::parse("topic.10").unwrap();
        let err = fetcher.fetch(&thread, 1).await.unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_fetch_page_zero_is_rejected_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server);
        let thread = ThreadRef::parse("topic.10").unwrap();
        let err = fetcher.fetch(&thread, 0).await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::InvalidUrl(ThreadRefError::InvalidPage(0))
        ));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(thread_page(&[1], None))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client =
            build_http_client(&create_test_config(), Duration::from_millis(200)).unwrap();
        let fetcher = HttpPageFetcher::new(
            client,
            Url::parse(&server.uri()).unwrap(),
            Duration::from_millis(10),
        );
        let thread = ThreadRef::parse("topic.10").unwrap();
        let err = fetcher.fetch(&thread, 1).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }));
    }
}
