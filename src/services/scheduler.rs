//! Sync scheduler - drives periodic refresh cycles against the upstream API
//!
//! One cycle: refresh the hierarchy when due, fetch live data per tracked
//! park, merge into the entity store, persist the snapshot, notify
//! subscribers. Retryable transport failures push the next cycle out with
//! exponential backoff (base = refresh interval, doubling, capped); the
//! last good snapshot keeps serving throughout. Permanent failures are
//! isolated to the park that hit them.

use crate::domain::{DestinationNode, EntityId, ParkNode};
use crate::infra::{Config, Metrics};
use crate::io::cache::SnapshotCache;
use crate::io::transport::{self, Transport, TransportError};
use crate::io::wire::{self, ChildrenResponse, DestinationsResponse, LiveResponse};
use crate::services::store::EntityStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// What a cycle accomplished, for pacing the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CycleResult {
    /// At least one merge was applied to the store
    merged: bool,
    /// At least one retryable failure occurred; the next cycle backs off
    retryable_failure: bool,
}

pub struct SyncScheduler {
    transport: Arc<dyn Transport>,
    store: Arc<EntityStore>,
    cache: SnapshotCache,
    config: Config,
    metrics: Arc<Metrics>,
    notify_tx: watch::Sender<u64>,
    generation: u64,
    cycles_since_hierarchy: u64,
    consecutive_failures: u32,
}

impl SyncScheduler {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<EntityStore>,
        cache: SnapshotCache,
        config: Config,
        metrics: Arc<Metrics>,
    ) -> Self {
        let (notify_tx, _) = watch::channel(0u64);
        Self {
            transport,
            store,
            cache,
            config,
            metrics,
            notify_tx,
            generation: 0,
            cycles_since_hierarchy: 0,
            consecutive_failures: 0,
        }
    }

    /// Subscribe to merge notifications. The watch value is a generation
    /// counter bumped after every cycle that applied a merge; consumers
    /// re-read the store snapshot when it changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify_tx.subscribe()
    }

    /// Run sync cycles until the shutdown signal flips.
    ///
    /// The shutdown channel is checked at every wait, so a stop request is
    /// observed within one sleep - no in-flight cache write is interrupted
    /// (persist is synchronous and atomic within a cycle).
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            refresh_secs = self.config.refresh_interval().as_secs(),
            tracked_parks = self.config.tracked_parks().len(),
            "sync_scheduler_started"
        );

        loop {
            let result = self.run_cycle().await;

            let delay = if result.retryable_failure {
                self.consecutive_failures += 1;
                self.metrics.record_cycle_backed_off();
                let delay = backoff_delay(
                    self.consecutive_failures,
                    self.config.refresh_interval(),
                    self.config.backoff_cap(),
                );
                warn!(
                    failures = self.consecutive_failures,
                    next_attempt_secs = delay.as_secs(),
                    "sync_backing_off"
                );
                delay
            } else {
                self.consecutive_failures = 0;
                self.config.refresh_interval()
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("sync_scheduler_shutdown");
                        return;
                    }
                }
            }
        }
    }

    async fn run_cycle(&mut self) -> CycleResult {
        let now = Utc::now();
        let mut merged = false;
        let mut retryable_failure = false;

        if self.hierarchy_due() {
            match self.fetch_hierarchy().await {
                Ok(nodes) => {
                    let destinations = nodes.len();
                    self.store.apply_hierarchy(&nodes, now);
                    self.cycles_since_hierarchy = 0;
                    self.metrics.record_hierarchy_refresh();
                    merged = true;
                    info!(destinations, "hierarchy_refreshed");
                }
                Err(e) if e.is_retryable() => {
                    // No hierarchy means nothing to merge live data into;
                    // the whole cycle goes to backoff
                    self.metrics.record_fetch_error(true);
                    warn!(error = %e, "hierarchy_fetch_failed");
                    return CycleResult { merged: false, retryable_failure: true };
                }
                Err(e) => {
                    self.metrics.record_fetch_error(false);
                    warn!(error = %e, "hierarchy_fetch_failed_permanent");
                }
            }
        }
        self.cycles_since_hierarchy += 1;

        for park in self.config.tracked_parks() {
            let park_id = EntityId::from(park.as_str());
            match self.fetch_live(&park_id).await {
                Ok(updates) => {
                    let stats = self.store.apply_live(&park_id, &updates, now);
                    self.metrics.record_live_merge(
                        stats.applied,
                        stats.discarded_stale,
                        stats.unmatched,
                    );
                    merged = true;
                    debug!(
                        park = %park_id,
                        applied = stats.applied,
                        discarded = stats.discarded_stale,
                        unmatched = stats.unmatched,
                        "live_merge_applied"
                    );
                }
                Err(e) if e.is_retryable() => {
                    // Keep going: other parks may still succeed this cycle
                    self.metrics.record_fetch_error(true);
                    retryable_failure = true;
                    warn!(park = %park_id, error = %e, "live_fetch_failed");
                }
                Err(e) => {
                    // Permanent for this cycle: degrade this park only
                    self.metrics.record_fetch_error(false);
                    self.store.mark_park_unknown(&park_id);
                    warn!(park = %park_id, error = %e, "live_fetch_failed_permanent");
                }
            }
        }

        if merged {
            self.persist_snapshot();
            self.generation += 1;
            let _ = self.notify_tx.send(self.generation);
            self.metrics.record_cycle_completed();
            info!(generation = self.generation, "sync_cycle_complete");
        }

        CycleResult { merged, retryable_failure }
    }

    fn hierarchy_due(&self) -> bool {
        self.store.snapshot().is_empty()
            || self.cycles_since_hierarchy >= self.config.hierarchy_refresh_cycles()
    }

    /// Fetch `/destinations`, then children for each tracked park.
    ///
    /// A retryable children failure aborts the refresh (whole cycle backs
    /// off); a permanent one leaves that park's attraction list alone - the
    /// store keeps whatever it already knew.
    async fn fetch_hierarchy(&self) -> Result<Vec<DestinationNode>, TransportError> {
        let value = self.transport.fetch(&transport::destinations_path()).await?;
        let response: DestinationsResponse = wire::decode(value)?;

        let mut nodes = Vec::with_capacity(response.destinations.len());
        for dest in response.destinations {
            if dest.id.is_empty() {
                debug!(name = %dest.name, "destination_missing_id");
                continue;
            }

            let mut parks = Vec::with_capacity(dest.parks.len());
            for park in dest.parks {
                if park.id.is_empty() {
                    debug!(name = %park.name, "park_missing_id");
                    continue;
                }

                let park_id = EntityId(park.id);
                let attractions = if self.is_tracked(&park_id) {
                    match self.fetch_children(&park_id).await {
                        Ok(attractions) => attractions,
                        Err(e) if e.is_retryable() => return Err(e),
                        Err(e) => {
                            self.metrics.record_fetch_error(false);
                            warn!(park = %park_id, error = %e, "children_fetch_failed_permanent");
                            Vec::new()
                        }
                    }
                } else {
                    Vec::new()
                };

                parks.push(ParkNode {
                    id: park_id,
                    name: park.name,
                    timezone: park.timezone,
                    attractions,
                });
            }

            nodes.push(DestinationNode { id: EntityId(dest.id), name: dest.name, parks });
        }

        Ok(nodes)
    }

    async fn fetch_children(
        &self,
        park_id: &EntityId,
    ) -> Result<Vec<crate::domain::AttractionNode>, TransportError> {
        let value = self.transport.fetch(&transport::children_path(park_id)).await?;
        let response: ChildrenResponse = wire::decode(value)?;
        Ok(response.attraction_nodes())
    }

    async fn fetch_live(
        &self,
        park_id: &EntityId,
    ) -> Result<Vec<crate::domain::LiveUpdate>, TransportError> {
        let value = self.transport.fetch(&transport::live_path(park_id)).await?;
        let response: LiveResponse = wire::decode(value)?;
        Ok(response.live_updates(Utc::now()))
    }

    fn is_tracked(&self, park_id: &EntityId) -> bool {
        self.config.tracked_parks().iter().any(|p| p == park_id.as_str())
    }

    /// Persist failure degrades to memory-only operation - logged, counted,
    /// never fatal. The next successful cycle tries again.
    fn persist_snapshot(&self) {
        let snapshot = self.store.snapshot();
        match self.cache.persist(&snapshot) {
            Ok(()) => self.metrics.record_cache_write(true),
            Err(e) => {
                self.metrics.record_cache_write(false);
                error!(error = %e, "cache_persist_failed");
            }
        }
    }
}

/// Exponential backoff: base after the first failure, doubling per
/// consecutive failure, saturating at the cap.
fn backoff_delay(consecutive_failures: u32, base: Duration, cap: Duration) -> Duration {
    let exponent = consecutive_failures.saturating_sub(1).min(31);
    let delay = base.saturating_mul(1u32 << exponent);
    delay.min(cap)
}
