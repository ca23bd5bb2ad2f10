//! Background sweep that evicts stale tracker records.
//!
//! The reaper only bounds memory. Blocking decisions never depend on it:
//! expired blocks are cleared lazily on access.

use super::AbuseGuardService;
use crate::domain::ReapReport;
use crate::ports::AbuseGuardApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Periodic reaper task
pub struct Reaper {
    guard: Arc<AbuseGuardService>,
    interval: Duration,
    batch_size: usize,
}

impl Reaper {
    /// Reaper using the guard's configured interval and batch size.
    pub fn new(guard: Arc<AbuseGuardService>) -> Self {
        let interval = guard.config().reaper.interval;
        let batch_size = guard.config().reaper.batch_size.max(1);
        Self {
            guard,
            interval,
            batch_size,
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One blocking sweep over every record.
    pub fn run_once(&self) -> ReapReport {
        self.guard.reap()
    }

    /// One sweep that yields to the runtime every `batch_size` keys.
    pub async fn sweep(&self) -> ReapReport {
        let now = self.guard.now();
        let keys = match self.guard.tracked_keys() {
            Ok(keys) => keys,
            Err(e) => {
                self.guard.metrics().record_tracking_error();
                warn!(error = %e, "Reaper could not list tracker records");
                return ReapReport::default();
            }
        };

        let mut removed = 0;
        for batch in keys.chunks(self.batch_size) {
            removed += batch
                .iter()
                .filter(|key| self.guard.remove_if_stale(key, now))
                .count();
            tokio::task::yield_now().await;
        }
        self.guard.metrics().record_reaped(removed);

        ReapReport {
            scanned: keys.len(),
            removed,
        }
    }

    /// Sweep every `interval` until `shutdown` flips to true or its sender
    /// is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick fires immediately; skip it so the first sweep happens
        // one interval after start.
        ticker.tick().await;

        info!(interval_secs = self.interval.as_secs(), "Reaper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.sweep().await;
                    if report.removed > 0 {
                        info!(
                            scanned = report.scanned,
                            removed = report.removed,
                            "Reaper sweep complete"
                        );
                    } else {
                        debug!(scanned = report.scanned, "Reaper sweep found nothing stale");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Reaper stopped");
                        break;
                    }
                }
            }
        }
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
