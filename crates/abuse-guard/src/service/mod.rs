//! # Abuse Guard Service
//!
//! Wires the domain logic to the outbound ports and implements
//! [`AbuseGuardApi`].
//!
//! Tracking is best-effort. Every store error is logged, counted and
//! swallowed: the guard fails open rather than turning a storage problem
//! into an outage.

mod reaper;


pub use reaper::Reaper;

use crate::adapters::{InMemoryTrackerStore, SystemTimeSource, TracingAuditSink};
use crate::domain::{
    evaluate, AuditEvent, BlockedError, ClientIdentityResolver, ClientKey, ClientStats,
    Evaluation, GuardConfig, GuardError, GuardStats, Outcome, ReapReport, StoreError,
    Timestamp, TrackerRecord,
};
use crate::metrics::{GuardMetrics, MetricsSnapshot};
use crate::ports::{AbuseGuardApi, AuditSink, TimeSource, TrackerStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The abuse guard engine
pub struct AbuseGuardService {
    config: GuardConfig,
    resolver: ClientIdentityResolver,
    store: Arc<dyn TrackerStore>,
    time_source: Arc<dyn TimeSource>,
    audit: Arc<dyn AuditSink>,
    metrics: Arc<GuardMetrics>,
}

impl AbuseGuardService {
    /// Create a guard with the in-memory store, the system clock and the
    /// tracing audit sink.
    pub fn new(config: GuardConfig) -> Result<Self, GuardError> {
        let store: Arc<dyn TrackerStore> = match config.max_tracked_clients {
            Some(limit) => Arc::new(InMemoryTrackerStore::with_capacity_limit(limit)),
            None => Arc::new(InMemoryTrackerStore::new()),
        };
        Self::with_ports(
            config,
            store,
            Arc::new(SystemTimeSource),
            Arc::new(TracingAuditSink),
        )
    }

    /// Create a guard over explicit port implementations.
    ///
    /// Fails fast on invalid configuration.
    pub fn with_ports(
        config: GuardConfig,
        store: Arc<dyn TrackerStore>,
        time_source: Arc<dyn TimeSource>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, GuardError> {
        config.validate()?;

        info!(
            enabled = config.enabled,
            max_failed_attempts = config.max_failed_attempts,
            failure_window_secs = config.failure_window.as_secs(),
            initial_block_secs = config.initial_block_duration.as_secs(),
            max_block_secs = config.max_block_duration.as_secs(),
            "Abuse guard initialized"
        );

        Ok(Self {
            resolver: ClientIdentityResolver::new(config.resolver.clone()),
            config,
            store,
            time_source,
            audit,
            metrics: Arc::new(GuardMetrics::new()),
        })
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn resolver(&self) -> &ClientIdentityResolver {
        &self.resolver
    }

    pub fn metrics(&self) -> Arc<GuardMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn now(&self) -> Timestamp {
        self.time_source.now()
    }

    /// Whether `key` participates in tracking at all.
    fn is_tracked(&self, key: &ClientKey) -> bool {
        self.config.enabled && !self.config.is_allowlisted(&key.to_string())
    }

    fn tracking_error(&self, operation: &'static str, key: Option<&ClientKey>, error: &StoreError) {
        self.metrics.record_tracking_error();
        warn!(
            operation,
            client_key = key.map(tracing::field::display),
            error = %error,
            "Abuse tracking failed, failing open"
        );
    }

    /// End of the block in force for `key`, clearing an ended one lazily.
    fn active_block(&self, key: &ClientKey, now: Timestamp) -> Option<Timestamp> {
        if !self.is_tracked(key) {
            return None;
        }

        let record = match self.store.get(key) {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                self.tracking_error("is_blocked", Some(key), &e);
                return None;
            }
        };

        if record.is_blocked_at(now) {
            return record.blocked_until;
        }

        if record.has_expired_block(now) {
            let released = self.store.update(key, &mut |current| {
                current.map(|mut r| {
                    r.release_if_expired(now);
                    r
                })
            });
            match released {
                Ok(_) => debug!(client_key = %key, "Block expired, client unblocked"),
                Err(e) => self.tracking_error("release_block", Some(key), &e),
            }
        }

        None
    }

    /// Keys currently held by the store, for sweeping.
    pub(crate) fn tracked_keys(&self) -> Result<Vec<ClientKey>, StoreError> {
        Ok(self.store.scan()?.into_iter().map(|(key, _)| key).collect())
    }

    /// Remove `key` if it is stale at `now`. The predicate is re-checked
    /// under the store's lock.
    pub(crate) fn remove_if_stale(&self, key: &ClientKey, now: Timestamp) -> bool {
        let config = &self.config;
        match self.store.delete_if(key, &|record| record.is_stale(now, config)) {
            Ok(removed) => {
                if removed {
                    debug!(client_key = %key, "Reaped stale tracker record");
                }
                removed
            }
            Err(e) => {
                self.tracking_error("reap", Some(key), &e);
                false
            }
        }
    }

    fn emit_block(&self, key: &ClientKey, evaluation: &Evaluation, reason: &str, now: Timestamp) {
        let Some(transition) = evaluation.transition else {
            return;
        };

        self.metrics.record_block();
        warn!(
            client_key = %key,
            failure_count = evaluation.record.failure_count,
            offense_count = evaluation.record.offense_count,
            block_duration_secs = transition.block_duration.as_secs(),
            reason,
            "Client blocked after repeated failures"
        );

        self.audit.emit(&AuditEvent::ip_blocked(
            key.clone(),
            evaluation.record.failure_count,
            transition.block_duration,
            reason,
            now,
        ));
    }
}

impl AbuseGuardApi for AbuseGuardService {
    fn is_blocked(&self, key: &ClientKey) -> bool {
        self.active_block(key, self.now()).is_some()
    }

    fn check(&self, key: &ClientKey) -> Result<(), BlockedError> {
        let now = self.now();
        match self.active_block(key, now) {
            Some(until) => {
                self.metrics.record_denied();
                let err = BlockedError::new(key.clone(), until, now);
                debug!(
                    client_key = %key,
                    retry_after_secs = err.retry_after_secs(),
                    "Request denied, client is blocked"
                );
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn record_failure(&self, key: &ClientKey, reason: &str) -> Option<Evaluation> {
        if !self.is_tracked(key) {
            return None;
        }

        let now = self.now();
        let config = &self.config;
        let mut evaluation: Option<Evaluation> = None;

        let stored = self.store.update(key, &mut |current| {
            let record = match current {
                Some(mut record) if !record.is_stale(now, config) => {
                    record.register_failure(now, Some(reason), config);
                    record
                }
                _ => TrackerRecord::first_failure(now, Some(reason)),
            };
            let eval = evaluate(&record, now, config);
            let next = eval.record.clone();
            evaluation = Some(eval);
            Some(next)
        });

        if let Err(e) = stored {
            self.tracking_error("record_failure", Some(key), &e);
            return None;
        }

        let evaluation = evaluation?;
        self.metrics.record_failure();

        if evaluation.transition.is_some() {
            self.emit_block(key, &evaluation, reason, now);
        } else {
            debug!(
                client_key = %key,
                failure_count = evaluation.record.failure_count,
                threshold = config.max_failed_attempts,
                reason,
                "Recorded failure"
            );
        }

        Some(evaluation)
    }

    fn reset(&self, key: &ClientKey) {
        if !self.is_tracked(key) {
            return;
        }
        match self.store.delete(key) {
            Ok(true) => {
                self.metrics.record_reset();
                info!(client_key = %key, "Cleared failure history after successful request");
            }
            Ok(false) => {}
            Err(e) => self.tracking_error("reset", Some(key), &e),
        }
    }

    fn unblock(&self, key: &ClientKey) -> bool {
        match self.store.delete(key) {
            Ok(removed) => {
                if removed {
                    self.metrics.record_reset();
                    info!(client_key = %key, "Client manually unblocked");
                }
                removed
            }
            Err(e) => {
                self.tracking_error("unblock", Some(key), &e);
                false
            }
        }
    }

    fn on_outcome(&self, key: &ClientKey, outcome: Outcome, reason: Option<&str>) {
        if outcome.is_failure(&self.config.exempt_statuses) {
            let reason = reason
                .map(str::to_owned)
                .unwrap_or_else(|| outcome.default_reason());
            self.record_failure(key, &reason);
        } else if outcome.is_authenticated_success() {
            self.reset(key);
        }
    }

    fn get_stats(&self) -> GuardStats {
        let now = self.now();
        let records = match self.store.scan() {
            Ok(records) => records,
            Err(e) => {
                self.tracking_error("get_stats", None, &e);
                return GuardStats::default();
            }
        };

        let mut per_client: Vec<ClientStats> = records
            .into_iter()
            .map(|(key, record)| {
                let blocked = record.is_blocked_at(now);
                ClientStats {
                    key,
                    failure_count: record.failure_count,
                    blocked,
                    blocked_until: record.blocked_until.filter(|_| blocked),
                    offense_count: record.offense_count,
                }
            })
            .collect();
        per_client.sort_by(|a, b| a.key.cmp(&b.key));

        GuardStats {
            total_tracked: per_client.len(),
            blocked_count: per_client.iter().filter(|c| c.blocked).count(),
            per_client,
        }
    }

    fn record(&self, key: &ClientKey) -> Option<TrackerRecord> {
        match self.store.get(key) {
            Ok(record) => record,
            Err(e) => {
                self.tracking_error("record", Some(key), &e);
                None
            }
        }
    }

    fn reap(&self) -> ReapReport {
        let now = self.now();
        let keys = match self.tracked_keys() {
            Ok(keys) => keys,
            Err(e) => {
                self.tracking_error("reap", None, &e);
                return ReapReport::default();
            }
        };

        let removed = keys
            .iter()
            .filter(|key| self.remove_if_stale(key, now))
            .count();
        self.metrics.record_reaped(removed);

        ReapReport {
            scanned: keys.len(),
            removed,
        }
    }
}
