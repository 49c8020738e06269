//! Crawler module for thread page fetching and incremental passes
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with an identifying user agent
//! - XenForo thread page parsing
//! - A fixed pause between page requests
//! - The watermark-driven crawl controller

mod controller;
mod fetcher;
mod pacer;
mod parser;

pub use controller::{Controller, CrawlOutcome, PassReport};
pub use fetcher::{build_http_client, user_agent_string, FetchError, HttpPageFetcher, PageFetcher};
pub use pacer::RequestPacer;
pub use parser::{parse_thread_page, MalformedPost, ParseError};
