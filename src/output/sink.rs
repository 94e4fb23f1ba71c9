//! Persistence sink
//!
//! Hands extracted records to the record store and commits in batches. Many
//! processing units call `save` concurrently; the store sits behind a mutex so
//! there is a single writer.

use crate::rules::Record;
use crate::storage::{RecordStore, StorageResult};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Counters describing what the sink has done so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Records the store accepted
    pub saved: u64,
    /// Records the store rejected
    pub failed: u64,
    /// Successful commits
    pub commits: u64,
}

/// Batching writer in front of a record store
pub struct PersistenceSink {
    store: Arc<Mutex<dyn RecordStore + Send>>,
    commit_every: usize,
    uncommitted: AtomicUsize,
    saved: AtomicU64,
    failed: AtomicU64,
    commits: AtomicU64,
}

impl PersistenceSink {
    /// Creates a new sink
    ///
    /// # Arguments
    ///
    /// * `store` - The storage backend to write to
    /// * `commit_every` - Commit after this many saved records
    pub fn new(store: Arc<Mutex<dyn RecordStore + Send>>, commit_every: usize) -> Self {
        Self {
            store,
            commit_every: commit_every.max(1),
            uncommitted: AtomicUsize::new(0),
            saved: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            commits: AtomicU64::new(0),
        }
    }

    // Store operations do not panic mid-write; a poisoned lock still guards a usable store.
    fn lock(&self) -> MutexGuard<'_, dyn RecordStore + Send + 'static> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes one record
    ///
    /// A rejected record is logged and counted; it never fails the caller.
    pub fn save(&self, record: Record) {
        let mut store = self.lock();

        if let Err(e) = store.insert_record(&record) {
            tracing::warn!("Failed to save record for {}: {}", record.page_url, e);
            self.failed.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.saved.fetch_add(1, Ordering::Relaxed);
        let pending = self.uncommitted.fetch_add(1, Ordering::Relaxed) + 1;

        if pending >= self.commit_every {
            if let Err(e) = self.commit_locked(&mut *store) {
                tracing::warn!("Batch commit of {} records failed: {}", pending, e);
            }
        }
    }

    /// Commits everything saved so far
    pub fn flush(&self) -> StorageResult<()> {
        let mut store = self.lock();
        self.commit_locked(&mut *store)
    }

    fn commit_locked(&self, store: &mut (dyn RecordStore + Send + 'static)) -> StorageResult<()> {
        let pending = self.uncommitted.load(Ordering::Relaxed);
        if pending == 0 {
            return Ok(());
        }

        store.commit()?;
        self.uncommitted.store(0, Ordering::Relaxed);
        self.commits.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Committed {} records", pending);
        Ok(())
    }

    /// Records saved but not yet committed
    pub fn uncommitted(&self) -> usize {
        self.uncommitted.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> SinkStats {
        SinkStats {
            saved: self.saved.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
        }
    }
}
