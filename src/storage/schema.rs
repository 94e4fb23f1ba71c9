//! Database schema definitions
//!
//! One row per extracted record. The table is append-only; existing rows are
//! never updated or deduplicated across runs.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_url TEXT NOT NULL,
    page_title TEXT,
    site_name TEXT,
    site_url TEXT,
    site_desc TEXT
);

CREATE INDEX IF NOT EXISTS idx_records_page_url ON records(page_url);
"#;

/// Initializes the database schema
///
/// Safe to run against an existing database.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
