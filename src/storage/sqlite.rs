//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the RecordStore trait.

use crate::rules::Record;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordStore, StorageError, StorageResult};
use crate::HarvestError;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::Path;

/// SQLite storage backend
///
/// Inserts run inside a transaction that is opened by the first insert after
/// a commit and closed by the next `commit`.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path` and ensures the schema exists
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// True while inserted records are waiting for `commit`
    pub fn has_uncommitted(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Loads every stored record in insertion order
    pub fn all_records(&self) -> StorageResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT page_url, page_title, site_name, site_url, site_desc
             FROM records ORDER BY id",
        )?;

        let rows = stmt.query_map([], |row| {
            let page_url: String = row.get(0)?;
            let mut fields = BTreeMap::new();
            for (i, name) in ["page_title", "site_name", "site_url", "site_desc"]
                .iter()
                .enumerate()
            {
                let value: Option<String> = row.get(i + 1)?;
                if value.is_some() {
                    fields.insert(name.to_string(), value);
                }
            }
            Ok(Record { page_url, fields })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl RecordStore for SqliteStorage {
    fn insert_record(&mut self, record: &Record) -> StorageResult<()> {
        if record.page_url.is_empty() {
            return Err(StorageError::ConstraintViolation(
                "page_url cannot be empty".to_string(),
            ));
        }

        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }

        self.conn.execute(
            "INSERT INTO records (page_url, page_title, site_name, site_url, site_desc)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.page_url,
                record.get("page_title"),
                record.get("site_name"),
                record.get("site_url"),
                record.get("site_desc"),
            ],
        )?;

        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn count_records(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
