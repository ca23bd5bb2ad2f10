//! Audit sinks.
//!
//! - [`TracingAuditSink`]: one structured `warn!` line per event.
//! - [`BroadcastAuditSink`]: fan-out over `tokio::sync::broadcast` for
//!   consumers such as an audit log writer or an alerting task.
//! - [`MultiAuditSink`]: forwards to several sinks in order.

use crate::domain::AuditEvent;
use crate::ports::AuditSink;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Default channel capacity for [`BroadcastAuditSink`]
pub const DEFAULT_AUDIT_CHANNEL_CAPACITY: usize = 1024;

/// Writes audit events to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: &AuditEvent) {
        warn!(
            event_type = %event.event_type,
            client_key = %event.client_key,
            failure_count = event.failure_count,
            block_duration_ms = event.block_duration_ms,
            reason = %event.reason,
            timestamp_ms = event.timestamp.as_millis(),
            "Client blocked"
        );
    }
}

/// Publishes audit events to broadcast subscribers.
///
/// Sending never blocks. Slow subscribers lag and lose the oldest events.
pub struct BroadcastAuditSink {
    sender: broadcast::Sender<AuditEvent>,
    events_published: AtomicU64,
}

impl BroadcastAuditSink {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_AUDIT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            events_published: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

impl Default for BroadcastAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for BroadcastAuditSink {
    fn emit(&self, event: &AuditEvent) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        match self.sender.send(event.clone()) {
            Ok(receivers) => debug!(receivers, "Audit event published"),
            Err(_) => debug!(
                client_key = %event.client_key,
                "Audit event dropped, no subscribers"
            ),
        }
    }
}

/// Forwards every event to each inner sink
#[derive(Clone, Default)]
pub struct MultiAuditSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl MultiAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl AuditSink for MultiAuditSink {
    fn emit(&self, event: &AuditEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
