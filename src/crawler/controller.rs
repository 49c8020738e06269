//! Incremental crawl controller
//!
//! This module contains the per-thread pass logic:
//! - Reading (or creating) the thread's watermark
//! - Fetching exactly the page span that can hold unseen posts
//! - Filtering and accumulating new posts in page-then-position order
//! - Advancing the watermark, then handing posts to the delivery sink
//!
//! A pass is all-or-nothing with respect to the watermark: any failure before
//! the advance leaves it untouched, so the next scheduled pass simply retries.
//! Posts are delivered only after the advance has been committed.

use crate::crawler::fetcher::PageFetcher;
use crate::delivery::{MessageFormat, MessageSink};
use crate::state::{PageResult, PassStatus, Post, ThreadWatermark};
use crate::storage::{PassLog, PassRecord, StorageError, WatermarkStore};
use crate::thread::ThreadRef;
use crate::MirrorError;
use chrono::Utc;
use std::collections::HashSet;

/// Result of the crawl half of a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOutcome {
    /// Watermark at the start of the pass
    pub previous: ThreadWatermark,

    /// Watermark at the end of the pass (equal to `previous` if nothing changed)
    pub watermark: ThreadWatermark,

    /// New posts in delivery order
    pub posts: Vec<Post>,

    /// Number of page requests made
    pub pages_fetched: u32,
}

impl CrawlOutcome {
    /// Returns true if the watermark was moved by this pass
    pub fn advanced(&self) -> bool {
        self.watermark != self.previous
    }
}

/// Summary of a complete pass (crawl + delivery)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub thread_id: i64,
    pub status: PassStatus,
    pub new_posts: usize,
    pub delivered: usize,
    pub failed_deliveries: usize,
    pub pages_fetched: u32,
    pub watermark: ThreadWatermark,
}

/// Collects new posts across the pages of one pass
struct Accumulator {
    floor: i64,
    posts: Vec<Post>,
    seen: HashSet<i64>,
    max_seen: i64,
}

impl Accumulator {
    fn new(previous: &ThreadWatermark) -> Self {
        Self {
            floor: previous.last_post_id,
            posts: Vec::new(),
            seen: HashSet::new(),
            max_seen: previous.last_post_id,
        }
    }

    /// Appends the page's unseen posts in document order
    ///
    /// The running maximum covers every post observed, so a page that lists
    /// ids out of order can never pull the watermark back.
    fn absorb(&mut self, page: PageResult) {
        if let Some(page_max) = page.max_post_id() {
            self.max_seen = self.max_seen.max(page_max);
        }
        for post in page.posts {
            // A post can show up twice when the thread shifts between requests
            if post.id > self.floor && self.seen.insert(post.id) {
                self.posts.push(post);
            }
        }
    }
}

/// Drives passes over threads
///
/// Passes for one thread must not overlap; the controller takes `&mut self`
/// so a single controller can only run one pass at a time.
pub struct Controller<S, F> {
    store: S,
    fetcher: F,
    format: MessageFormat,
}

impl<S, F> Controller<S, F>
where
    S: WatermarkStore,
    F: PageFetcher,
{
    /// Creates a controller over a watermark store and a page fetcher
    pub fn new(store: S, fetcher: F) -> Self {
        Self {
            store,
            fetcher,
            format: MessageFormat::default(),
        }
    }

    /// Sets the outbound message format
    pub fn with_format(mut self, format: MessageFormat) -> Self {
        self.format = format;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Runs the crawl half of a pass and returns the new posts
    ///
    /// # Algorithm
    ///
    /// 1. Read the watermark, initializing it on first sight of the thread
    /// 2. Fetch page `last_page`; stop if it has no new post and the thread
    ///    has not grown past it
    /// 3. Fetch the remaining pages up to the reported total, keeping posts
    ///    newer than `last_post_id` in page-then-position order
    /// 4. Advance the watermark to (total pages, highest id seen)
    ///
    /// Any error returns before step 4; nothing is committed.
    pub async fn crawl(&mut self, thread: &ThreadRef) -> Result<CrawlOutcome, MirrorError> {
        let thread_id = thread.id();
        let previous = self.load_or_initialize(thread_id)?;

        tracing::debug!(
            "Thread {} watermark: page {}, post {}",
            thread_id,
            previous.last_page,
            previous.last_post_id
        );

        let first = self.fetcher.fetch(thread, previous.last_page).await?;
        let mut pages_fetched = 1;
        let total_pages = first.total_pages;

        let has_new = first.posts.iter().any(|p| previous.is_new(p.id));
        if !has_new && total_pages <= previous.last_page {
            tracing::info!("Thread {}: no new posts", thread_id);
            return Ok(CrawlOutcome {
                previous,
                watermark: previous,
                posts: Vec::new(),
                pages_fetched,
            });
        }

        let mut accumulator = Accumulator::new(&previous);
        accumulator.absorb(first);

        for page in (previous.last_page + 1)..=total_pages {
            let result = self.fetcher.fetch(thread, page).await?;
            pages_fetched += 1;
            tracing::debug!(
                "Thread {} page {}/{}: {} posts",
                thread_id,
                page,
                total_pages,
                result.posts.len()
            );
            accumulator.absorb(result);
        }

        let watermark = ThreadWatermark {
            thread_id,
            // Never below the stored page, even if the thread lost pages since
            last_page: total_pages.max(previous.last_page),
            last_post_id: accumulator.max_seen,
        };

        if watermark != previous {
            self.store
                .advance(thread_id, watermark.last_page, watermark.last_post_id)?;
            tracing::info!(
                "Thread {}: advanced to page {}, post {} ({} new posts)",
                thread_id,
                watermark.last_page,
                watermark.last_post_id,
                accumulator.posts.len()
            );
        }

        Ok(CrawlOutcome {
            previous,
            watermark,
            posts: accumulator.posts,
            pages_fetched,
        })
    }

    fn load_or_initialize(&mut self, thread_id: i64) -> Result<ThreadWatermark, StorageError> {
        match self.store.get(thread_id) {
            Ok(watermark) => Ok(watermark),
            Err(StorageError::NotFound(_)) => {
                tracing::info!("First sight of thread {}, initializing watermark", thread_id);
                self.store.initialize(thread_id)
            }
            Err(e) => Err(e),
        }
    }

    /// Publishes posts one at a time, in order
    ///
    /// A failed message is logged and skipped; the watermark has already
    /// moved past it.
    async fn deliver(&self, thread_id: i64, posts: &[Post], sink: &dyn MessageSink) -> usize {
        let mut failed = 0;
        for post in posts {
            let message = self.format.render(thread_id, post);
            if let Err(e) = sink.publish(&message).await {
                failed += 1;
                tracing::warn!(
                    "Failed to deliver post {} of thread {} via {}: {}",
                    post.id,
                    thread_id,
                    sink.name(),
                    e
                );
            }
        }
        failed
    }
}

impl<S, F> Controller<S, F>
where
    S: WatermarkStore + PassLog,
    F: PageFetcher,
{
    /// Runs one complete pass: crawl, then deliver, then record the pass
    ///
    /// # Returns
    ///
    /// * `Ok(PassReport)` - The watermark is consistent; individual delivery
    ///   failures are counted in the report
    /// * `Err(MirrorError)` - The pass aborted; nothing was committed or delivered
    pub async fn run_pass(
        &mut self,
        thread: &ThreadRef,
        sink: &dyn MessageSink,
    ) -> Result<PassReport, MirrorError> {
        let thread_id = thread.id();
        let started_at = Utc::now().to_rfc3339();
        tracing::info!("Starting pass for thread {} ({})", thread_id, thread);

        let outcome = match self.crawl(thread).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Pass for thread {} aborted: {}", thread_id, e);
                self.log_pass(PassRecord {
                    id: 0,
                    thread_id,
                    started_at,
                    finished_at: Utc::now().to_rfc3339(),
                    status: PassStatus::Failed,
                    new_posts: 0,
                    pages_fetched: 0,
                    error_message: Some(e.to_string()),
                });
                return Err(e);
            }
        };

        let status = if outcome.advanced() {
            PassStatus::Completed
        } else {
            PassStatus::Unchanged
        };

        let failed_deliveries = self.deliver(thread_id, &outcome.posts, sink).await;
        let new_posts = outcome.posts.len();

        if new_posts > 0 {
            tracing::info!(
                "Thread {}: delivered {}/{} posts via {}",
                thread_id,
                new_posts - failed_deliveries,
                new_posts,
                sink.name()
            );
        }

        self.log_pass(PassRecord {
            id: 0,
            thread_id,
            started_at,
            finished_at: Utc::now().to_rfc3339(),
            status,
            new_posts: new_posts as u32,
            pages_fetched: outcome.pages_fetched,
            error_message: (failed_deliveries > 0)
                .then(|| format!("{} deliveries failed", failed_deliveries)),
        });

        Ok(PassReport {
            thread_id,
            status,
            new_posts,
            delivered: new_posts - failed_deliveries,
            failed_deliveries,
            pages_fetched: outcome.pages_fetched,
            watermark: outcome.watermark,
        })
    }

    fn log_pass(&mut self, record: PassRecord) {
        if let Err(e) = self.store.record_pass(&record) {
            tracing::warn!(
                "Could not record pass history for thread {}: {}",
                record.thread_id,
                e
            );
        }
    }
}
