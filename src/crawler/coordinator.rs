//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator seeds the frontier with the root URL and then only watches:
//! every admitted URL gets its own task, which waits for a limiter permit,
//! fetches and extracts the page, admits the children it finds and spawns a
//! task for each. The coordinator polls the frontier until nothing is pending
//! or in flight, flushing the persistence sink on every tick.
//!
//! A parent admits its children before it finishes, so the frontier can only
//! look quiescent once the whole reachable graph is done.

use crate::config::{validate, Config};
use crate::crawler::limiter::Limiter;
use crate::crawler::{build_http_client, fetch_url};
use crate::output::{CrawlSummary, PersistenceSink};
use crate::rules::{extract_page, RuleSet};
use crate::state::{Admission, Frontier, PageOutcome, WorkItem};
use crate::storage::{open_storage, RecordStore};
use crate::url::{normalize_link, normalize_root};
use crate::HarvestError;
use reqwest::Client;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Lifecycle of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    /// Root URL is being admitted
    Seeding,
    /// Processing units are spawning one another
    Running,
    /// Waiting for the frontier to go quiescent
    Draining,
    /// No further work is admitted; the sink has been flushed
    Stopped,
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Seeding => "seeding",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// State shared by the coordinator and every processing unit
struct Shared {
    frontier: Frontier,
    limiter: Limiter,
    client: Client,
    rules: RuleSet,
    sink: PersistenceSink,
    root_prefix: String,
    max_depth: u32,
    progress_every: u64,
    pages_done: AtomicU64,
    records_incomplete: AtomicU64,
    cancel: CancellationToken,
    /// Set when `run` begins; progress rates are measured from here
    started: OnceLock<Instant>,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    shared: Arc<Shared>,
    poll_interval: Duration,
    state: CrawlState,
}

impl Coordinator {
    /// Creates a coordinator writing to the configured SQLite database
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Storage opened and HTTP client built
    /// * `Err(HarvestError)` - Either collaborator could not be created
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        let storage = open_storage(Path::new(&config.output.database_path))?;
        Self::with_store(config, Arc::new(Mutex::new(storage)))
    }

    /// Creates a coordinator writing to an already opened record store
    ///
    /// The configuration is validated first, so settings the runtime cannot
    /// honour (a zero poll interval, zero concurrency) are reported here.
    pub fn with_store(
        config: Config,
        store: Arc<Mutex<dyn RecordStore + Send>>,
    ) -> Result<Self, HarvestError> {
        validate(&config)?;

        let rules = RuleSet::compile(&config.rules)?;
        let root_prefix = normalize_root(&config.crawler.root_url)?;
        let client = build_http_client(&config.user_agent, config.crawler.request_timeout_secs)?;

        let shared = Shared {
            frontier: Frontier::new(),
            limiter: Limiter::new(config.crawler.max_in_flight as usize),
            client,
            rules,
            sink: PersistenceSink::new(store, config.output.commit_every),
            root_prefix,
            max_depth: config.crawler.max_depth,
            progress_every: config.crawler.progress_every,
            pages_done: AtomicU64::new(0),
            records_incomplete: AtomicU64::new(0),
            cancel: CancellationToken::new(),
            started: OnceLock::new(),
        };

        Ok(Self {
            shared: Arc::new(shared),
            poll_interval: Duration::from_millis(config.crawler.poll_interval_ms),
            state: CrawlState::Seeding,
        })
    }

    /// Token that stops the crawl when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn frontier(&self) -> &Frontier {
        &self.shared.frontier
    }

    pub fn limiter(&self) -> &Limiter {
        &self.shared.limiter
    }

    /// Canonical root URL; every admitted URL starts with it
    pub fn root_prefix(&self) -> &str {
        &self.shared.root_prefix
    }

    /// Runs the crawl until the frontier is quiescent or the token is cancelled
    ///
    /// Per-page failures never end the run; they are logged and recorded as
    /// that page's outcome. Only a failed final commit is returned as an error.
    pub async fn run(&mut self) -> Result<CrawlSummary, HarvestError> {
        let started = *self.shared.started.get_or_init(Instant::now);

        self.transition(CrawlState::Seeding);
        tracing::info!(
            "Starting crawl of {} (max depth {}, max in flight {}, {} rules)",
            self.shared.root_prefix,
            self.shared.max_depth,
            self.shared.limiter.capacity(),
            self.shared.rules.len()
        );

        let root = WorkItem::root(self.shared.root_prefix.clone());
        match self
            .shared
            .frontier
            .try_admit(&root, &self.shared.root_prefix, self.shared.max_depth)
        {
            Admission::Admitted => {
                self.transition(CrawlState::Running);
                spawn_unit(&self.shared, root);
            }
            refused => tracing::warn!("Root URL {} was not admitted: {:?}", root.url, refused),
        }

        self.transition(CrawlState::Draining);
        let interrupted = self.drain().await;
        if interrupted {
            tracing::warn!("Crawl interrupted, stopping without waiting for in-flight pages");
        }

        self.stop(interrupted)?;

        let summary = CrawlSummary {
            frontier: self.shared.frontier.counts(),
            records: self.shared.sink.stats(),
            records_incomplete: self.shared.records_incomplete.load(Ordering::Relaxed),
            interrupted,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            "Crawl finished: {} completed ({} ok), {} records saved in {:?}",
            summary.frontier.completed,
            summary.frontier.succeeded,
            summary.records.saved,
            summary.elapsed
        );

        Ok(summary)
    }

    /// Polls until quiescent; returns true if cancelled first
    async fn drain(&self) -> bool {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shared.cancel.cancelled() => return true,
                _ = ticker.tick() => {
                    if let Err(e) = self.shared.sink.flush() {
                        tracing::warn!("Periodic commit failed: {}", e);
                    }
                    if self.shared.frontier.is_quiescent() {
                        return false;
                    }
                }
            }
        }
    }

    fn stop(&mut self, interrupted: bool) -> Result<(), HarvestError> {
        self.shared.frontier.close();
        if interrupted {
            self.shared.cancel.cancel();
            self.shared.limiter.close();
        }

        self.shared.sink.flush()?;
        self.transition(CrawlState::Stopped);
        Ok(())
    }

    fn transition(&mut self, next: CrawlState) {
        tracing::debug!("Crawl state: {} -> {}", self.state, next);
        self.state = next;
    }
}

/// Runs a complete crawl with storage from `config`
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::config::default_config;
/// use sumi_harvest::crawler::run_crawl;
///
/// # async fn example() -> Result<(), sumi_harvest::HarvestError> {
/// let summary = run_crawl(default_config()).await?;
/// println!("{} pages completed", summary.frontier.completed);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlSummary, HarvestError> {
    let mut coordinator = Coordinator::new(config)?;
    coordinator.run().await
}

fn spawn_unit(shared: &Arc<Shared>, item: WorkItem) {
    let shared = Arc::clone(shared);
    tokio::spawn(async move { run_unit(shared, item).await });
}

/// One processing unit: permit, fetch, extract, admit children, finish
async fn run_unit(shared: Arc<Shared>, item: WorkItem) {
    let _permit = tokio::select! {
        biased;
        _ = shared.cancel.cancelled() => return,
        permit = shared.limiter.acquire() => match permit {
            Ok(permit) => permit,
            Err(_) => return,
        },
    };

    if let Err(e) = shared.frontier.begin_work(&item.url) {
        tracing::error!("{}", e);
        return;
    }

    {
        let mut unit = UnitGuard::new(&shared.frontier, &item.url);
        unit.outcome = process_page(&shared, &item).await;
    }

    report_progress(&shared);
}

/// Finishes the URL when dropped, so a panicking or aborted unit still
/// leaves the in-flight set; anything unfinished counts as failed.
struct UnitGuard<'a> {
    frontier: &'a Frontier,
    url: &'a str,
    outcome: PageOutcome,
}

impl<'a> UnitGuard<'a> {
    fn new(frontier: &'a Frontier, url: &'a str) -> Self {
        Self {
            frontier,
            url,
            outcome: PageOutcome::Failed,
        }
    }
}

impl Drop for UnitGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.frontier.finish_work(self.url, self.outcome) {
            tracing::error!("{}", e);
        }
    }
}

async fn process_page(shared: &Arc<Shared>, item: &WorkItem) -> PageOutcome {
    tracing::debug!("Processing {} (depth {})", item.url, item.depth);

    let page = match fetch_url(&shared.client, &item.url).await {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!("Failed to fetch {}: {}", item.url, e);
            return PageOutcome::Failed;
        }
    };

    let Some(body) = page.body else {
        tracing::debug!(
            "Skipping {}: status {}, content type '{}'",
            item.url,
            page.status,
            page.content_type
        );
        return PageOutcome::Skipped;
    };

    let extraction = extract_page(&shared.rules, &item.url, &body);

    if extraction.incomplete > 0 {
        shared
            .records_incomplete
            .fetch_add(extraction.incomplete as u64, Ordering::Relaxed);
    }
    for record in extraction.records {
        shared.sink.save(record);
    }

    let mut admitted = 0usize;
    for raw in &extraction.links {
        let url = normalize_link(raw, &item.url);
        if url.is_empty() {
            continue;
        }

        let child = WorkItem::child(url, item.url.as_str(), item.depth);
        match shared
            .frontier
            .try_admit(&child, &shared.root_prefix, shared.max_depth)
        {
            Admission::Admitted => {
                admitted += 1;
                spawn_unit(shared, child);
            }
            refused => tracing::trace!("Not admitting {}: {:?}", child.url, refused),
        }
    }

    tracing::debug!(
        "Processed {}: {} rules matched, {} links found, {} admitted",
        item.url,
        extraction.matched_rules,
        extraction.links.len(),
        admitted
    );

    PageOutcome::Processed
}

fn report_progress(shared: &Shared) {
    let done = shared.pages_done.fetch_add(1, Ordering::Relaxed) + 1;
    if shared.progress_every == 0 || done % shared.progress_every != 0 {
        return;
    }

    let counts = shared.frontier.counts();
    let elapsed = shared
        .started
        .get()
        .map_or(Duration::ZERO, Instant::elapsed);
    let rate = done as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    tracing::info!(
        "Progress: {} pages completed, {} pending, {} in flight, {:.2} pages/sec",
        done,
        counts.pending,
        counts.in_flight,
        rate
    );
}
