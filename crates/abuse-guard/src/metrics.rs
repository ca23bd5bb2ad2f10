//! Guard counters.
//!
//! Plain atomics; a scrape endpoint reads them through [`GuardMetrics::snapshot`].

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Abuse guard metrics
#[derive(Debug, Default)]
pub struct GuardMetrics {
    pub failures_recorded: AtomicU64,
    pub blocks_issued: AtomicU64,
    pub requests_denied: AtomicU64,
    pub resets: AtomicU64,
    pub records_reaped: AtomicU64,
    /// Store errors swallowed by failing open
    pub tracking_errors: AtomicU64,
}

impl GuardMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_failure(&self) {
        self.failures_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_block(&self) {
        self.blocks_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_denied(&self) {
        self.requests_denied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reaped(&self, count: usize) {
        self.records_reaped
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_tracking_error(&self) {
        self.tracking_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            failures_recorded: self.failures_recorded.load(Ordering::Relaxed),
            blocks_issued: self.blocks_issued.load(Ordering::Relaxed),
            requests_denied: self.requests_denied.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
            records_reaped: self.records_reaped.load(Ordering::Relaxed),
            tracking_errors: self.tracking_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`GuardMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub failures_recorded: u64,
    pub blocks_issued: u64,
    pub requests_denied: u64,
    pub resets: u64,
    pub records_reaped: u64,
    pub tracking_errors: u64,
}
