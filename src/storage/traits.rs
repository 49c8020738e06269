//! Storage traits and error types
//!
//! This module defines the trait interfaces for storage backends and
//! associated error types.

use crate::state::ThreadWatermark;
use crate::storage::PassRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("No watermark for thread {0}")]
    NotFound(i64),

    #[error("Watermark for thread {0} already exists")]
    AlreadyExists(i64),

    #[error(
        "Refusing to move watermark of thread {thread_id} backwards to page {page}, post {post_id}"
    )]
    Regression {
        thread_id: i64,
        page: u32,
        post_id: i64,
    },

    #[error("Corrupt watermark for thread {thread_id}: {message}")]
    Corrupt { thread_id: i64, message: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StorageError {
    /// Returns true if the backend itself failed, as opposed to a
    /// precondition on a single record
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Sqlite(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Per-thread watermark persistence
///
/// Every call is a single atomic operation: a concurrent reader never sees a
/// watermark with only one of its fields updated.
pub trait WatermarkStore {
    /// Gets the watermark of a thread
    ///
    /// Returns `StorageError::NotFound` if the thread was never seen.
    fn get(&self, thread_id: i64) -> StorageResult<ThreadWatermark>;

    /// Creates the initial watermark (page 1, post 0) for a thread
    ///
    /// Fails with `StorageError::AlreadyExists` if a record is present; the
    /// caller is expected to `get` first.
    fn initialize(&mut self, thread_id: i64) -> StorageResult<ThreadWatermark>;

    /// Sets both fields of an existing watermark
    ///
    /// Never recreates a vanished record: returns `StorageError::NotFound`
    /// instead. Moving either field backwards is rejected with
    /// `StorageError::Regression`.
    fn advance(&mut self, thread_id: i64, new_page: u32, new_post_id: i64) -> StorageResult<()>;

    /// Lists all known watermarks ordered by thread id
    fn list(&self) -> StorageResult<Vec<ThreadWatermark>>;
}

/// History of crawl passes
pub trait PassLog {
    /// Records a finished pass and returns its id
    fn record_pass(&mut self, record: &PassRecord) -> StorageResult<i64>;

    /// Gets the most recent pass of a thread
    fn latest_pass(&self, thread_id: i64) -> StorageResult<Option<PassRecord>>;

    /// Counts recorded passes of a thread
    fn count_passes(&self, thread_id: i64) -> StorageResult<u64>;
}
