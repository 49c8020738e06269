//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the xf-mirror database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One watermark per mirrored thread
CREATE TABLE IF NOT EXISTS watermarks (
    thread_id INTEGER PRIMARY KEY,
    last_page INTEGER NOT NULL DEFAULT 1 CHECK (last_page >= 1),
    last_post_id INTEGER NOT NULL DEFAULT 0 CHECK (last_post_id >= 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Track crawl passes
CREATE TABLE IF NOT EXISTS passes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    thread_id INTEGER NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    status TEXT NOT NULL,
    new_posts INTEGER NOT NULL DEFAULT 0,
    pages_fetched INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_passes_thread ON passes(thread_id, id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
