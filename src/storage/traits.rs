//! Storage traits and error types
//!
//! This module defines the trait interface for record storage backends and
//! associated error types.

use crate::rules::Record;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for record storage backends
///
/// Writes are buffered until `commit`; a backend may hold them in an open
/// transaction. Callers serialize access themselves.
pub trait RecordStore {
    /// Appends one extracted record
    fn insert_record(&mut self, record: &Record) -> StorageResult<()>;

    /// Makes all inserted records durable
    fn commit(&mut self) -> StorageResult<()>;

    /// Counts committed and uncommitted records
    fn count_records(&self) -> StorageResult<u64>;
}
