//! Storage module for persisting mirror state
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Per-thread watermarks (get, initialize-if-absent, atomic advance)
//! - Pass history for operational visibility

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{PassLog, StorageError, StorageResult, WatermarkStore};

use crate::state::PassStatus;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - The database could not be opened
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// One recorded crawl pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassRecord {
    pub id: i64,
    pub thread_id: i64,
    pub started_at: String,
    pub finished_at: String,
    pub status: PassStatus,
    pub new_posts: u32,
    pub pages_fetched: u32,
    pub error_message: Option<String>,
}
