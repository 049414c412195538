//! Sync engine metrics collection and periodic reporting
//!
//! Counters use Relaxed atomics - they are statistical only and must never
//! drive coordination or logic decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Lock-free counters for the sync engine.
///
/// Recording is lock-free; `report()` loads a consistent-enough view for
/// logging (exact cross-counter consistency is not needed at this cadence).
pub struct Metrics {
    start_time: Instant,
    /// Completed sync cycles (at least one merge applied)
    cycles_completed: AtomicU64,
    /// Cycles that ended in backoff due to a retryable failure
    cycles_backed_off: AtomicU64,
    /// Full hierarchy refreshes performed
    hierarchy_refreshes: AtomicU64,
    /// Transient fetch failures (timeout / connection / 5xx)
    fetch_errors_transient: AtomicU64,
    /// Permanent fetch failures (4xx / decode)
    fetch_errors_permanent: AtomicU64,
    /// Live updates merged into the store
    live_updates_applied: AtomicU64,
    /// Live updates discarded for carrying an older timestamp
    live_updates_discarded: AtomicU64,
    /// Live updates dropped for unknown attraction ids
    live_updates_unmatched: AtomicU64,
    /// Successful cache writes
    cache_writes: AtomicU64,
    /// Failed cache writes (engine degrades to memory-only)
    cache_write_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            cycles_completed: AtomicU64::new(0),
            cycles_backed_off: AtomicU64::new(0),
            hierarchy_refreshes: AtomicU64::new(0),
            fetch_errors_transient: AtomicU64::new(0),
            fetch_errors_permanent: AtomicU64::new(0),
            live_updates_applied: AtomicU64::new(0),
            live_updates_discarded: AtomicU64::new(0),
            live_updates_unmatched: AtomicU64::new(0),
            cache_writes: AtomicU64::new(0),
            cache_write_failures: AtomicU64::new(0),
        }
    }

    pub fn record_cycle_completed(&self) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle_backed_off(&self) {
        self.cycles_backed_off.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hierarchy_refresh(&self) {
        self.hierarchy_refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_error(&self, retryable: bool) {
        if retryable {
            self.fetch_errors_transient.fetch_add(1, Ordering::Relaxed);
        } else {
            self.fetch_errors_permanent.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_live_merge(&self, applied: u64, discarded: u64, unmatched: u64) {
        self.live_updates_applied.fetch_add(applied, Ordering::Relaxed);
        self.live_updates_discarded.fetch_add(discarded, Ordering::Relaxed);
        self.live_updates_unmatched.fetch_add(unmatched, Ordering::Relaxed);
    }

    pub fn record_cache_write(&self, ok: bool) {
        if ok {
            self.cache_writes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_write_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn report(&self) -> MetricsSummary {
        MetricsSummary {
            uptime_secs: self.start_time.elapsed().as_secs(),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_backed_off: self.cycles_backed_off.load(Ordering::Relaxed),
            hierarchy_refreshes: self.hierarchy_refreshes.load(Ordering::Relaxed),
            fetch_errors_transient: self.fetch_errors_transient.load(Ordering::Relaxed),
            fetch_errors_permanent: self.fetch_errors_permanent.load(Ordering::Relaxed),
            live_updates_applied: self.live_updates_applied.load(Ordering::Relaxed),
            live_updates_discarded: self.live_updates_discarded.load(Ordering::Relaxed),
            live_updates_unmatched: self.live_updates_unmatched.load(Ordering::Relaxed),
            cache_writes: self.cache_writes.load(Ordering::Relaxed),
            cache_write_failures: self.cache_write_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub uptime_secs: u64,
    pub cycles_completed: u64,
    pub cycles_backed_off: u64,
    pub hierarchy_refreshes: u64,
    pub fetch_errors_transient: u64,
    pub fetch_errors_permanent: u64,
    pub live_updates_applied: u64,
    pub live_updates_discarded: u64,
    pub live_updates_unmatched: u64,
    pub cache_writes: u64,
    pub cache_write_failures: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            uptime_secs = self.uptime_secs,
            cycles = self.cycles_completed,
            backed_off = self.cycles_backed_off,
            hierarchy_refreshes = self.hierarchy_refreshes,
            errors_transient = self.fetch_errors_transient,
            errors_permanent = self.fetch_errors_permanent,
            updates_applied = self.live_updates_applied,
            updates_discarded = self.live_updates_discarded,
            updates_unmatched = self.live_updates_unmatched,
            cache_writes = self.cache_writes,
            cache_failures = self.cache_write_failures,
            "metrics_summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = Metrics::new();
        metrics.record_cycle_completed();
        metrics.record_cycle_completed();
        metrics.record_cycle_backed_off();
        metrics.record_fetch_error(true);
        metrics.record_fetch_error(false);
        metrics.record_live_merge(12, 1, 2);
        metrics.record_live_merge(8, 0, 0);
        metrics.record_cache_write(true);
        metrics.record_cache_write(false);

        let summary = metrics.report();
        assert_eq!(summary.cycles_completed, 2);
        assert_eq!(summary.cycles_backed_off, 1);
        assert_eq!(summary.fetch_errors_transient, 1);
        assert_eq!(summary.fetch_errors_permanent, 1);
        assert_eq!(summary.live_updates_applied, 20);
        assert_eq!(summary.live_updates_discarded, 1);
        assert_eq!(summary.live_updates_unmatched, 2);
        assert_eq!(summary.cache_writes, 1);
        assert_eq!(summary.cache_write_failures, 1);
    }
}
