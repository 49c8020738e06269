//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the storage traits.

use crate::state::{PassStatus, ThreadWatermark};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PassLog, StorageError, StorageResult, WatermarkStore};
use crate::storage::PassRecord;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError::Unavailable)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path).map_err(|e| {
            StorageError::Unavailable(format!("cannot open {}: {}", path.display(), e))
        })?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
        ",
        )
        .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn exists(&self, thread_id: i64) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT thread_id FROM watermarks WHERE thread_id = ?1",
                params![thread_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

fn watermark_from_row(row: &Row<'_>) -> rusqlite::Result<(i64, i64, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

/// Converts raw column values, rejecting values the schema should never hold
fn decode_watermark(
    (thread_id, last_page, last_post_id): (i64, i64, i64),
) -> StorageResult<ThreadWatermark> {
    let last_page = u32::try_from(last_page)
        .ok()
        .filter(|p| *p >= 1)
        .ok_or_else(|| StorageError::Corrupt {
            thread_id,
            message: format!("last_page {} out of range", last_page),
        })?;

    if last_post_id < 0 {
        return Err(StorageError::Corrupt {
            thread_id,
            message: format!("last_post_id {} is negative", last_post_id),
        });
    }

    Ok(ThreadWatermark {
        thread_id,
        last_page,
        last_post_id,
    })
}

fn pass_from_row(row: &Row<'_>) -> rusqlite::Result<PassRecord> {
    Ok(PassRecord {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        status: PassStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(PassStatus::Failed),
        new_posts: row.get(5)?,
        pages_fetched: row.get(6)?,
        error_message: row.get(7)?,
    })
}

impl WatermarkStore for SqliteStorage {
    fn get(&self, thread_id: i64) -> StorageResult<ThreadWatermark> {
        let raw = self
            .conn
            .query_row(
                "SELECT thread_id, last_page, last_post_id FROM watermarks WHERE thread_id = ?1",
                params![thread_id],
                watermark_from_row,
            )
            .optional()?
            .ok_or(StorageError::NotFound(thread_id))?;

        decode_watermark(raw)
    }

    fn initialize(&mut self, thread_id: i64) -> StorageResult<ThreadWatermark> {
        let initial = ThreadWatermark::initial(thread_id);
        let now = Utc::now().to_rfc3339();

        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO watermarks (thread_id, last_page, last_post_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![thread_id, initial.last_page, initial.last_post_id, now],
        )?;

        if inserted == 0 {
            return Err(StorageError::AlreadyExists(thread_id));
        }

        Ok(initial)
    }

    fn advance(&mut self, thread_id: i64, new_page: u32, new_post_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();

        // Guarded single-statement update: both fields change together or not at all
        let updated = self.conn.execute(
            "UPDATE watermarks SET last_page = ?1, last_post_id = ?2, updated_at = ?3
             WHERE thread_id = ?4 AND last_page <= ?1 AND last_post_id <= ?2",
            params![new_page, new_post_id, now, thread_id],
        )?;

        if updated == 0 {
            if self.exists(thread_id)? {
                return Err(StorageError::Regression {
                    thread_id,
                    page: new_page,
                    post_id: new_post_id,
                });
            }
            return Err(StorageError::NotFound(thread_id));
        }

        Ok(())
    }

    fn list(&self) -> StorageResult<Vec<ThreadWatermark>> {
        let mut stmt = self.conn.prepare(
            "SELECT thread_id, last_page, last_post_id FROM watermarks ORDER BY thread_id",
        )?;

        let rows = stmt
            .query_map([], watermark_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(decode_watermark).collect()
    }
}

impl PassLog for SqliteStorage {
    fn record_pass(&mut self, record: &PassRecord) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO passes (thread_id, started_at, finished_at, status, new_posts, pages_fetched, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.thread_id,
                record.started_at,
                record.finished_at,
                record.status.to_db_string(),
                record.new_posts,
                record.pages_fetched,
                record.error_message,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn latest_pass(&self, thread_id: i64) -> StorageResult<Option<PassRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, thread_id, started_at, finished_at, status, new_posts, pages_fetched, error_message
                 FROM passes WHERE thread_id = ?1 ORDER BY id DESC LIMIT 1",
                params![thread_id],
                pass_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn count_passes(&self, thread_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM passes WHERE thread_id = ?1",
            params![thread_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
