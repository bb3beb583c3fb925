//! Fire-and-forget ingestion
//!
//! Producers (packet hooks, roster pollers, the market board handler) hand
//! facts to an [`Ingestor`] and return immediately. Each fact is applied to
//! the [`ResolutionCache`] on its own runtime task; failures end up in the log
//! and nowhere else.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use super::{IngestOutcome, ResolutionCache, Result, RetainerTrackError};
use crate::domain::{ContentIdMapping, Fact, ListingEntry, WorldId};

/// Tracks ingestion tasks that have been submitted but not finished
#[derive(Default)]
pub struct InFlightTracker {
    /// Number of running tasks
    active: AtomicU64,
    /// Total tasks submitted
    total: AtomicU64,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a task starting; the returned guard marks it finished on drop
    pub fn start(self: &Arc<Self>) -> InFlightGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            tracker: Arc::clone(self),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    pub fn total_count(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    /// Wait until no task is running, giving up after `timeout`
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let start = Instant::now();

        while self.active_count() > 0 {
            if start.elapsed() > timeout {
                warn!(
                    active = self.active_count(),
                    "Timeout waiting for ingestion to drain"
                );
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        true
    }
}

/// Guard that decrements the active count when dropped
pub struct InFlightGuard {
    tracker: Arc<InFlightTracker>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.tracker.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Apply one fact to the cache
pub async fn apply_fact(cache: &ResolutionCache, fact: Fact) -> IngestOutcome {
    match fact {
        Fact::Ownership { world_id, entries } => cache.ingest_ownership(world_id, &entries).await,
        Fact::Identity(mappings) => cache.ingest_identity(&mappings).await,
    }
}

/// Cloneable submission handle around a shared [`ResolutionCache`]
#[derive(Clone)]
pub struct Ingestor {
    cache: Arc<ResolutionCache>,
    runtime: Handle,
    tracker: Arc<InFlightTracker>,
}

impl Ingestor {
    /// Create an ingestor spawning onto the current tokio runtime
    pub fn new(cache: Arc<ResolutionCache>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            RetainerTrackError::Configuration(format!("ingestor needs a tokio runtime: {e}"))
        })?;
        Ok(Self::with_handle(cache, runtime))
    }

    /// Create an ingestor spawning onto `runtime`
    ///
    /// Submissions may then come from any thread, including ones the runtime
    /// does not own.
    pub fn with_handle(cache: Arc<ResolutionCache>, runtime: Handle) -> Self {
        Self {
            cache,
            runtime,
            tracker: Arc::new(InFlightTracker::new()),
        }
    }

    pub fn cache(&self) -> &Arc<ResolutionCache> {
        &self.cache
    }

    /// Queue a fact for ingestion and return immediately
    pub fn submit(&self, fact: Fact) {
        if fact.is_empty() {
            return;
        }

        let guard = self.tracker.start();
        let cache = Arc::clone(&self.cache);
        self.runtime.spawn(async move {
            let _guard = guard;
            let kind = fact.kind();
            let len = fact.len();
            let outcome = apply_fact(&cache, fact).await;
            debug!(kind, len, ?outcome, "Ingestion task finished");
        });
    }

    /// Queue a marketplace listing page observed on `world_id`
    pub fn submit_market_board_page(&self, world_id: WorldId, entries: Vec<ListingEntry>) {
        self.submit(Fact::Ownership { world_id, entries });
    }

    pub fn submit_mapping(&self, mapping: ContentIdMapping) {
        self.submit(Fact::from(mapping));
    }

    pub fn submit_mappings(&self, mappings: Vec<ContentIdMapping>) {
        self.submit(Fact::Identity(mappings));
    }

    /// Number of ingestion tasks still running
    pub fn in_flight(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Number of ingestion tasks ever submitted
    pub fn total_submitted(&self) -> u64 {
        self.tracker.total_count()
    }

    /// Wait for all submitted facts to be applied
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let drained = self.tracker.wait_for_drain(timeout).await;
        if drained {
            info!(
                total = self.total_submitted(),
                "All submitted facts ingested"
            );
        }
        drained
    }
}
