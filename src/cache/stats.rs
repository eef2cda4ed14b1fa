//! Session Statistics Module
//!
//! Tracks read hits and misses, writes, touch delivery and sweep activity.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Session Stats ==
/// Shared counters, updated from request handlers, workers and the sweeper.
#[derive(Debug, Default)]
pub struct SessionStats {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    touches_dispatched: AtomicU64,
    touches_applied: AtomicU64,
    touches_dropped: AtomicU64,
    touches_skipped: AtomicU64,
    touches_failed: AtomicU64,
    sweeps_run: AtomicU64,
    sweeps_skipped: AtomicU64,
    namespaces_evicted: AtomicU64,
}

// == Stats Snapshot ==
/// Point-in-time copy of [`SessionStats`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Reads that found a session
    pub hits: u64,
    /// Reads that found no namespace or no session
    pub misses: u64,
    pub writes: u64,
    pub deletes: u64,
    /// Touches handed to the task runner
    pub touches_dispatched: u64,
    /// Touches that updated a record
    pub touches_applied: u64,
    /// Touches rejected by a saturated or stopped runner
    pub touches_dropped: u64,
    /// Touches whose record was already deleted or evicted
    pub touches_skipped: u64,
    /// Touches whose store call failed
    pub touches_failed: u64,
    pub sweeps_run: u64,
    /// Sweeper ticks skipped because a previous run was still active
    pub sweeps_skipped: u64,
    pub namespaces_evicted: u64,
}

impl StatsSnapshot {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    /// Increments the read hit counter.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Miss ==
    /// Increments the read miss counter.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Write ==
    /// Increments the write counter.
    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Delete ==
    /// Increments the delete counter.
    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Touch Dispatched ==
    /// Counts a touch accepted by the task runner.
    pub fn record_touch_dispatched(&self) {
        self.touches_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Touch Applied ==
    /// Counts a touch that moved a record's access time.
    pub fn record_touch_applied(&self) {
        self.touches_applied.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Touch Dropped ==
    /// Counts a touch the task runner refused.
    pub fn record_touch_dropped(&self) {
        self.touches_dropped.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Touch Skipped ==
    /// Counts a touch whose session was already deleted or evicted.
    pub fn record_touch_skipped(&self) {
        self.touches_skipped.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Touch Failed ==
    /// Counts a touch lost to a store error.
    pub fn record_touch_failed(&self) {
        self.touches_failed.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Sweep ==
    /// Counts a completed sweep run.
    pub fn record_sweep(&self) {
        self.sweeps_run.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Sweep Skipped ==
    /// Counts a sweep tick skipped while another run was active.
    pub fn record_sweep_skipped(&self) {
        self.sweeps_skipped.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Evictions ==
    /// Adds the namespaces evicted by one sweep run.
    pub fn record_evictions(&self, count: u64) {
        self.namespaces_evicted.fetch_add(count, Ordering::Relaxed);
    }

    // == Snapshot ==
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            touches_dispatched: self.touches_dispatched.load(Ordering::Relaxed),
            touches_applied: self.touches_applied.load(Ordering::Relaxed),
            touches_dropped: self.touches_dropped.load(Ordering::Relaxed),
            touches_skipped: self.touches_skipped.load(Ordering::Relaxed),
            touches_failed: self.touches_failed.load(Ordering::Relaxed),
            sweeps_run: self.sweeps_run.load(Ordering::Relaxed),
            sweeps_skipped: self.sweeps_skipped.load(Ordering::Relaxed),
            namespaces_evicted: self.namespaces_evicted.load(Ordering::Relaxed),
        }
    }
}
