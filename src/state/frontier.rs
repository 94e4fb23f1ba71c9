//! The crawl frontier
//!
//! Three disjoint sets of URLs (pending, in-flight, completed) behind a single
//! mutex. Every admission decision goes through [`Frontier::try_admit`], which
//! checks scope, depth and prior sightings and inserts in one critical section,
//! so concurrent discoverers of the same URL admit it exactly once.

use crate::state::{PageOutcome, UrlState};
use crate::url::is_in_scope;
use crate::HarvestError;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A discovered URL waiting for an admission decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Normalized absolute URL
    pub url: String,

    /// Page the link was found on (empty for the root)
    pub parent_url: String,

    /// Link distance from the root
    pub depth: u32,
}

impl WorkItem {
    /// The root of a crawl, at depth 0
    pub fn root(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            parent_url: String::new(),
            depth: 0,
        }
    }

    /// A link found on `parent_url`, one level below it
    pub fn child(url: impl Into<String>, parent_url: impl Into<String>, parent_depth: u32) -> Self {
        Self {
            url: url.into(),
            parent_url: parent_url.into(),
            depth: parent_depth + 1,
        }
    }
}

/// Result of an admission attempt
///
/// Only `Admitted` puts the URL into the frontier. The refusals are not
/// errors; the item is simply dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// URL does not start with the crawl root
    OutOfScope,
    /// Depth exceeds the configured maximum
    TooDeep,
    /// URL is already pending, in flight or completed
    AlreadySeen,
    /// The crawl is stopping and takes no new work
    Closed,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Point-in-time sizes of the frontier sets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierCounts {
    pub pending: usize,
    pub in_flight: usize,
    pub completed: usize,
    /// Completed URLs whose success flag is true
    pub succeeded: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
struct FrontierState {
    pending: HashSet<String>,
    in_flight: HashSet<String>,
    completed: HashMap<String, PageOutcome>,
    closed: bool,
}

impl FrontierState {
    fn state_of(&self, url: &str) -> Option<UrlState> {
        if self.pending.contains(url) {
            Some(UrlState::Pending)
        } else if self.in_flight.contains(url) {
            Some(UrlState::InFlight)
        } else if self.completed.contains_key(url) {
            Some(UrlState::Completed)
        } else {
            None
        }
    }
}

/// Shared crawl state; one instance per run
#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<FrontierState>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    // No operation panics while holding the lock, so a poisoned guard still
    // holds consistent sets.
    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admits `item.url` into the pending set if it is in scope, shallow enough and unseen
    ///
    /// # Arguments
    ///
    /// * `item` - The discovered URL with its depth
    /// * `root_prefix` - Canonical root URL every admitted URL must start with
    /// * `max_depth` - Deepest level that may still be admitted
    pub fn try_admit(&self, item: &WorkItem, root_prefix: &str, max_depth: u32) -> Admission {
        let mut state = self.lock();

        let admission = if state.closed {
            Admission::Closed
        } else if !is_in_scope(&item.url, root_prefix) {
            Admission::OutOfScope
        } else if item.depth > max_depth {
            Admission::TooDeep
        } else if state.state_of(&item.url).is_some() {
            Admission::AlreadySeen
        } else {
            state.pending.insert(item.url.clone());
            Admission::Admitted
        };

        tracing::trace!(
            "Admission of {} at depth {}: {:?}",
            item.url,
            item.depth,
            admission
        );
        admission
    }

    /// Moves `url` from pending to in-flight
    pub fn begin_work(&self, url: &str) -> Result<(), HarvestError> {
        let mut state = self.lock();

        if state.pending.remove(url) {
            state.in_flight.insert(url.to_string());
            Ok(())
        } else {
            Err(HarvestError::InvalidTransition {
                url: url.to_string(),
                from: state.state_of(url),
                to: UrlState::InFlight,
            })
        }
    }

    /// Moves `url` from in-flight to completed with the given outcome
    pub fn finish_work(&self, url: &str, outcome: PageOutcome) -> Result<(), HarvestError> {
        let mut state = self.lock();

        if state.in_flight.remove(url) {
            state.completed.insert(url.to_string(), outcome);
            Ok(())
        } else {
            Err(HarvestError::InvalidTransition {
                url: url.to_string(),
                from: state.state_of(url),
                to: UrlState::Completed,
            })
        }
    }

    /// True when nothing is pending and nothing is in flight
    pub fn is_quiescent(&self) -> bool {
        let state = self.lock();
        state.pending.is_empty() && state.in_flight.is_empty()
    }

    /// Stops all further admissions
    pub fn close(&self) {
        self.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Which set `url` is in, if it has ever been admitted
    pub fn state_of(&self, url: &str) -> Option<UrlState> {
        self.lock().state_of(url)
    }

    /// Outcome of a completed URL
    pub fn outcome_of(&self, url: &str) -> Option<PageOutcome> {
        self.lock().completed.get(url).copied()
    }

    /// Success flag of a completed URL
    pub fn success_of(&self, url: &str) -> Option<bool> {
        self.outcome_of(url).map(|outcome| outcome.is_success())
    }

    /// All completed URLs, sorted
    pub fn completed_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.lock().completed.keys().cloned().collect();
        urls.sort();
        urls
    }

    pub fn counts(&self) -> FrontierCounts {
        let state = self.lock();
        let mut counts = FrontierCounts {
            pending: state.pending.len(),
            in_flight: state.in_flight.len(),
            completed: state.completed.len(),
            ..FrontierCounts::default()
        };

        for outcome in state.completed.values() {
            if outcome.is_success() {
                counts.succeeded += 1;
            }
            match outcome {
                PageOutcome::Processed => counts.processed += 1,
                PageOutcome::Skipped => counts.skipped += 1,
                PageOutcome::Failed => counts.failed += 1,
            }
        }

        counts
    }

    /// Checks that no URL sits in two sets at once
    #[cfg(test)]
    pub(crate) fn is_disjoint(&self) -> bool {
        let state = self.lock();
        state.pending.is_disjoint(&state.in_flight)
            && state
                .pending
                .iter()
                .chain(state.in_flight.iter())
                .all(|url| !state.completed.contains_key(url))
    }
}
