//! Idle Namespace Sweep
//!
//! Background task that periodically evicts user namespaces whose sessions
//! have all gone unused for longer than the idle threshold.
//!
//! The scan is not isolated from writers: a session written after its
//! namespace was sampled as idle, but before the eviction lands, is lost with
//! the rest of the namespace.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::{Namespace, SessionStore};
use crate::error::{Result, SessionError};

// == Sweep Phase ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepPhase {
    Idle,
    Scanning,
    Evicting,
}

impl SweepPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SweepPhase::Scanning,
            2 => SweepPhase::Evicting,
            _ => SweepPhase::Idle,
        }
    }
}

// == Sweep Report ==
/// Outcome of one sweep run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Namespaces examined
    pub scanned: usize,
    /// Users whose namespace was evicted
    pub evicted: Vec<String>,
    /// Namespaces skipped because a store call failed
    pub failed: usize,
}

// == Idle Sweeper ==
pub struct IdleSweeper {
    store: SessionStore,
    idle_threshold: chrono::Duration,
    drop_namespaces: bool,
    phase: AtomicU8,
}

/// Returns the sweeper to `Idle` however the run ends.
struct PhaseGuard<'a>(&'a AtomicU8);

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.0.store(SweepPhase::Idle as u8, Ordering::Release);
    }
}

impl IdleSweeper {
    /// Creates a sweeper evicting namespaces idle for longer than `idle_threshold`.
    ///
    /// With `drop_namespaces` the evicted namespace is destroyed, otherwise only emptied.
    pub fn new(store: SessionStore, idle_threshold: Duration, drop_namespaces: bool) -> Self {
        Self {
            store,
            idle_threshold: chrono::Duration::from_std(idle_threshold)
                .unwrap_or(chrono::Duration::MAX),
            drop_namespaces,
            phase: AtomicU8::new(SweepPhase::Idle as u8),
        }
    }

    pub fn phase(&self) -> SweepPhase {
        SweepPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Runs one sweep now. Returns `None` if another run is still in progress.
    pub async fn run_once(&self) -> Option<SweepReport> {
        self.sweep_at(Utc::now()).await
    }

    /// Runs one sweep, measuring idleness against `now`.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Option<SweepReport> {
        let stats = self.store.stats();
        if self
            .phase
            .compare_exchange(
                SweepPhase::Idle as u8,
                SweepPhase::Scanning as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            stats.record_sweep_skipped();
            debug!("Idle sweep skipped, previous run still active");
            return None;
        }
        let _guard = PhaseGuard(&self.phase);

        let report = self.sweep(now).await;

        stats.record_sweep();
        stats.record_evictions(report.evicted.len() as u64);
        Some(report)
    }

    async fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        let namespaces = match self.store.namespaces().await {
            Ok(namespaces) => namespaces,
            Err(err) => {
                warn!("Idle sweep could not list namespaces: {}", err);
                report.failed += 1;
                return report;
            }
        };

        for namespace in namespaces {
            self.set_phase(SweepPhase::Scanning);
            report.scanned += 1;

            let idle = match self.idle_time(&namespace, now).await {
                Ok(idle) => idle,
                // Already gone
                Err(SessionError::NamespaceNotFound(_)) => continue,
                Err(err) => {
                    warn!("Idle sweep could not scan '{}': {}", namespace.name, err);
                    report.failed += 1;
                    continue;
                }
            };

            // An empty namespace has no recent access at all
            let eligible = idle.map_or(true, |idle| idle > self.idle_threshold);
            if !eligible {
                continue;
            }

            self.set_phase(SweepPhase::Evicting);
            match self.store.evict(&namespace, self.drop_namespaces).await {
                Ok(cleared) => {
                    info!(
                        "Namespace '{}' evicted after {} idle, {} sessions cleared",
                        namespace.name,
                        idle.map_or_else(|| "empty".to_string(), |d| format!("{}s", d.num_seconds())),
                        cleared
                    );
                    report.evicted.push(namespace.user_id);
                }
                Err(err) => {
                    warn!("Idle sweep could not evict '{}': {}", namespace.name, err);
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Time since the most recent access across the namespace, `None` if it is empty.
    async fn idle_time(
        &self,
        namespace: &Namespace,
        now: DateTime<Utc>,
    ) -> Result<Option<chrono::Duration>> {
        let records = self.store.scan(namespace).await?;
        Ok(records
            .iter()
            .map(|record| record.last_accessed_at)
            .max()
            .map(|last| (now - last).max(chrono::Duration::zero())))
    }

    fn set_phase(&self, phase: SweepPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }
}

/// Spawns the periodic sweep. The first run starts immediately.
///
/// Runs execute inline on the ticker task, so aborting the returned handle also
/// cancels a run in progress. Ticks missed during a long run are skipped.
///
/// # Example
/// ```ignore
/// let sweeper = Arc::new(IdleSweeper::new(store, Duration::from_secs(120), true));
/// let sweep_handle = spawn_sweep_task(sweeper, Duration::from_secs(120));
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(sweeper: Arc<IdleSweeper>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting idle sweep task with interval of {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            if let Some(report) = sweeper.run_once().await {
                if report.evicted.is_empty() {
                    debug!("Idle sweep: {} namespaces scanned, none evicted", report.scanned);
                } else {
                    info!(
                        "Idle sweep: evicted {} of {} namespaces ({} failed)",
                        report.evicted.len(),
                        report.scanned,
                        report.failed
                    );
                }
            }
        }
    })
}
