//! HTML parser for XenForo thread pages
//!
//! This module turns one page of a thread into structured post records:
//! - Posts are `article.message` elements carrying `data-content="post-<id>"`
//! - Author, body, timestamp and permalink come from the standard XenForo 2 markup
//! - The highest page number comes from the `.pageNav-main` pagination control

use crate::state::{PageResult, Post};
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// Errors that make a whole page unusable
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("document contains no thread posts")]
    NotAThreadPage,

    #[error("invalid selector '{0}'")]
    InvalidSelector(String),
}

/// A single post element that could not be turned into a `Post`
///
/// These are skipped and logged, never fatal to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedPost {
    /// Position of the element among the page's post elements
    pub index: usize,

    /// What was wrong with it
    pub reason: String,
}

/// Compiled selectors for one parse
struct PostSelectors {
    post: Selector,
    author_link: Selector,
    author_header: Selector,
    body: Selector,
    time: Selector,
    attribution_link: Selector,
    page_nav: Selector,
    page_nav_item: Selector,
}

impl PostSelectors {
    fn new() -> Result<Self, ParseError> {
        Ok(Self {
            post: selector("article.message")?,
            author_link: selector("h4.message-name a")?,
            author_header: selector("h4.message-name")?,
            body: selector(".message-body .bbWrapper")?,
            time: selector(".message-attribution time")?,
            attribution_link: selector(".message-attribution a[href]")?,
            page_nav: selector(".pageNav-main")?,
            page_nav_item: selector("li")?,
        })
    }
}

fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|_| ParseError::InvalidSelector(css.to_string()))
}

/// Parses one thread page
///
/// Post elements without a parseable id are skipped (and counted in
/// `PageResult::skipped`); any other missing field falls back to a default.
/// A document with no post elements at all is not a thread page.
///
/// # Arguments
///
/// * `html` - The HTML content of the page
/// * `page_url` - The URL the page was fetched from, used to resolve permalinks
///
/// # Example
///
/// ```
/// use url::Url;
/// use xf_mirror::crawler::parse_thread_page;
///
/// let html = r#"<html><body>
///   <article class="message" data-content="post-101">
///     <h4 class="message-name"><a data-user-id="5">alice</a></h4>
///     <div class="message-body"><div class="bbWrapper">Hello</div></div>
///   </article>
/// </body></html>"#;
/// let url = Url::parse("https://forum.example.com/t/topic.1/page-1").unwrap();
/// let page = parse_thread_page(html, &url).unwrap();
/// assert_eq!(page.posts[0].id, 101);
/// assert_eq!(page.total_pages, 1);
/// ```
pub fn parse_thread_page(html: &str, page_url: &Url) -> Result<PageResult, ParseError> {
    let document = Html::parse_document(html);
    let selectors = PostSelectors::new()?;

    let mut posts = Vec::new();
    let mut skipped = 0;
    let mut elements = 0;

    for (index, element) in document.select(&selectors.post).enumerate() {
        elements += 1;
        match parse_post(index, element, &selectors, page_url) {
            Ok(post) => posts.push(post),
            Err(malformed) => {
                tracing::warn!(
                    "Skipping malformed post #{} on {}: {}",
                    malformed.index,
                    page_url,
                    malformed.reason
                );
                skipped += 1;
            }
        }
    }

    if elements == 0 {
        return Err(ParseError::NotAThreadPage);
    }

    let total_pages = extract_total_pages(&document, &selectors, page_url);

    Ok(PageResult {
        posts,
        total_pages,
        skipped,
    })
}

/// Extracts one post; only a missing or unparseable id is an error
fn parse_post(
    index: usize,
    element: ElementRef<'_>,
    selectors: &PostSelectors,
    page_url: &Url,
) -> Result<Post, MalformedPost> {
    let id = extract_post_id(element).ok_or_else(|| MalformedPost {
        index,
        reason: "missing or non-numeric post id".to_string(),
    })?;

    let author_link = element.select(&selectors.author_link).next();

    let author_id = author_link
        .and_then(|a| a.value().attr("data-user-id"))
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(0);

    // Guests have no profile link, only a plain name in the header
    let author_name = author_link
        .or_else(|| element.select(&selectors.author_header).next())
        .map(|e| collapse_whitespace(&e.text().collect::<String>()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    let body = element
        .select(&selectors.body)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let posted_at = element
        .select(&selectors.time)
        .next()
        .and_then(|t| parse_post_time(t.value().attr("data-time"), t.value().attr("datetime")))
        .unwrap_or_default();

    let permalink = element
        .select(&selectors.attribution_link)
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| page_url.join(href.trim()).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| {
            let mut url = page_url.clone();
            url.set_fragment(Some(&format!("post-{}", id)));
            url.to_string()
        });

    Ok(Post {
        id,
        author_id,
        author_name,
        body,
        posted_at,
        permalink,
    })
}

/// Reads the post id from `data-content="post-123"`, falling back to `id="js-post-123"`
fn extract_post_id(element: ElementRef<'_>) -> Option<i64> {
    let value = element.value();
    value
        .attr("data-content")
        .and_then(|v| v.trim().strip_prefix("post-"))
        .or_else(|| {
            value
                .attr("id")
                .and_then(|v| v.trim().strip_prefix("js-post-"))
        })
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|id| *id > 0)
}

/// Converts the Unix `data-time` attribute, or the ISO `datetime` attribute
fn parse_post_time(data_time: Option<&str>, datetime: Option<&str>) -> Option<DateTime<Utc>> {
    data_time
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .or_else(|| {
            datetime
                .and_then(|v| DateTime::parse_from_str(v.trim(), "%Y-%m-%dT%H:%M:%S%z").ok())
                .map(|dt| dt.with_timezone(&Utc))
        })
}

/// Reads the last page number from the pagination control
///
/// Threads that fit on one page have no pagination control at all.
fn extract_total_pages(document: &Html, selectors: &PostSelectors, page_url: &Url) -> u32 {
    let Some(nav) = document.select(&selectors.page_nav).next() else {
        return 1;
    };

    let last = nav
        .select(&selectors.page_nav_item)
        .last()
        .map(|li| li.text().collect::<String>().trim().to_string());

    match last.as_deref().map(str::parse::<u32>) {
        Some(Ok(pages)) if pages >= 1 => pages,
        _ => {
            tracing::warn!(
                "Unreadable pagination control on {} ({:?}), assuming a single page",
                page_url,
                last
            );
            1
        }
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://forum.example.com/t/topic.10/page-2").unwrap()
    }

    fn post_html(id: &str, user_id: &str, name: &str, time: &str, body: &str) -> String {
        format!(
            r#"<article class="message message--post" data-content="{id}">
                <div class="message-cell message-cell--user">
                    <h4 class="message-name"><a href="/u/{name}.{user_id}/" data-user-id="{user_id}">{name}</a></h4>
                </div>
                <div class="message-cell message-cell--main">
                    <header class="message-attribution">
                        <a href="/t/topic.10/post-{num}"><time class="u-dt" data-time="{time}" datetime="2021-01-01T00:00:00+0000">Jan 1</time></a>
                    </header>
                    <article class="message-body"><div class="bbWrapper">{body}</div></article>
                </div>
            </article>"#,
            id = id,
            user_id = user_id,
            name = name,
            time = time,
            body = body,
            num = id.trim_start_matches("post-"),
        )
    }

    fn page(posts: &[String], nav: Option<&str>) -> String {
        format!(
            "<html><body>{}<div class=\"block-body\">{}</div>{}</body></html>",
            nav.map(|n| format!("<nav><ul class=\"pageNav-main\">{}</ul></nav>", n))
                .unwrap_or_default(),
            posts.join("\n"),
            nav.map(|n| format!("<nav><ul class=\"pageNav-main\">{}</ul></nav>", n))
                .unwrap_or_default(),
        )
    }

    #[test]
    fn test_parse_single_post() {
        let html = page(
            &[post_html("post-101", "7", "alice", "1609459200", " Hello world ")],
            None,
        );
        let result = parse_thread_page(&html, &page_url()).unwrap();

        assert_eq!(result.posts.len(), 1);
        let post = &result.posts[0];
        assert_eq!(post.id, 101);
        assert_eq!(post.author_id, 7);
        assert_eq!(post.author_name, "alice");
        assert_eq!(post.body, "Hello world");
        assert_eq!(post.posted_at.timestamp(), 1609459200);
        assert_eq!(
            post.permalink,
            "https://forum.example.com/t/topic.10/post-101"
        );
        assert_eq!(result.total_pages, 1);
        assert_eq!(result.skipped, 0);
    }

    #[test]
    fn test_posts_keep_document_order() {
        let html = page(
            &[
                post_html("post-101", "1", "a", "1", "one"),
                post_html("post-102", "2", "b", "2", "two"),
                post_html("post-103", "3", "c", "3", "three"),
            ],
            None,
        );
        let result = parse_thread_page(&html, &page_url()).unwrap();
        let ids: Vec<i64> = result.posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![101, 102, 103]);
        assert_eq!(result.max_post_id(), Some(103));
    }

    #[test]
    fn test_total_pages_from_pagination() {
        let nav = r#"<li class="pageNav-page"><a href="/t/topic.10/">1</a></li>
                     <li class="pageNav-page pageNav-page--current"><a href="/t/topic.10/page-2">2</a></li>
                     <li class="pageNav-page"><a href="/t/topic.10/page-17">17</a></li>"#;
        let html = page(&[post_html("post-5", "1", "a", "1", "x")], Some(nav));
        let result = parse_thread_page(&html, &page_url()).unwrap();
        assert_eq!(result.total_pages, 17);
    }

    #[test]
    fn test_unreadable_pagination_defaults_to_one() {
        let nav = r#"<li class="pageNav-page"><a>next</a></li>"#;
        let html = page(&[post_html("post-5", "1", "a", "1", "x")], Some(nav));
        let result = parse_thread_page(&html, &page_url()).unwrap();
        assert_eq!(result.total_pages, 1);
    }

    #[test]
    fn test_post_without_id_is_skipped() {
        let html = page(
            &[
                post_html("post-101", "1", "a", "1", "ok"),
                post_html("quote-xyz", "2", "b", "2", "bad"),
                post_html("post-103", "3", "c", "3", "ok"),
            ],
            None,
        );
        let result = parse_thread_page(&html, &page_url()).unwrap();
        let ids: Vec<i64> = result.posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![101, 103]);
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn test_js_post_id_fallback() {
        let html = r#"<html><body>
            <article class="message" id="js-post-555">
                <h4 class="message-name"><a data-user-id="1">a</a></h4>
            </article>
        </body></html>"#;
        let result = parse_thread_page(html, &page_url()).unwrap();
        assert_eq!(result.posts[0].id, 555);
    }

    #[test]
    fn test_missing_optional_fields_use_defaults() {
        let html = r#"<html><body>
            <article class="message" data-content="post-9">
                <h4 class="message-name"><span class="username">Guest   User</span></h4>
            </article>
        </body></html>"#;
        let result = parse_thread_page(html, &page_url()).unwrap();
        let post = &result.posts[0];

        assert_eq!(post.id, 9);
        assert_eq!(post.author_id, 0);
        assert_eq!(post.author_name, "Guest User");
        assert_eq!(post.body, "");
        assert_eq!(post.posted_at.timestamp(), 0);
        assert_eq!(
            post.permalink,
            "https://forum.example.com/t/topic.10/page-2#post-9"
        );
    }

    #[test]
    fn test_iso_datetime_fallback() {
        let html = r#"<html><body>
            <article class="message" data-content="post-9">
                <header class="message-attribution">
                    <time datetime="2021-06-01T12:00:00+0700">June</time>
                </header>
            </article>
        </body></html>"#;
        let result = parse_thread_page(html, &page_url()).unwrap();
        assert_eq!(
            result.posts[0].posted_at.to_rfc3339(),
            "2021-06-01T05:00:00+00:00"
        );
    }

    #[test]
    fn test_document_without_posts_is_an_error() {
        let html = "<html><body><h1>Oops! We ran into some problems.</h1></body></html>";
        assert_eq!(
            parse_thread_page(html, &page_url()),
            Err(ParseError::NotAThreadPage)
        );
    }

    #[test]
    fn test_non_html_is_an_error() {
        assert_eq!(
            parse_thread_page("{\"error\": true}", &page_url()),
            Err(ParseError::NotAThreadPage)
        );
    }
}
