//! # Driving Ports (Inbound API)
//!
//! What the routing layer calls on every request.

use crate::domain::{
    BlockedError, ClientKey, Evaluation, GuardStats, Outcome, ReapReport, TrackerRecord,
};

/// Abuse guard operations.
///
/// All calls are synchronous and never surface tracking errors: on a store
/// failure the guard fails open and reports "not blocked".
pub trait AbuseGuardApi: Send + Sync {
    /// Whether `key` serves an active block. Clears an ended block lazily.
    fn is_blocked(&self, key: &ClientKey) -> bool;

    /// Gate for request entry: `Err` carries the active block.
    fn check(&self, key: &ClientKey) -> Result<(), BlockedError>;

    /// Count one failure against `key`, then evaluate and persist the
    /// resulting block, if any. Returns the evaluation, or `None` when the
    /// key is not tracked (guard disabled, allow-listed, or store failure).
    fn record_failure(&self, key: &ClientKey, reason: &str) -> Option<Evaluation>;

    /// Forget everything about `key`.
    fn reset(&self, key: &ClientKey);

    /// Operator override: lift any block on `key` and forget its history.
    fn unblock(&self, key: &ClientKey) -> bool;

    /// Feed back the downstream result of a request that was allowed.
    fn on_outcome(&self, key: &ClientKey, outcome: Outcome, reason: Option<&str>);

    /// Snapshot of all tracked clients.
    fn get_stats(&self) -> GuardStats;

    /// Snapshot of one record.
    fn record(&self, key: &ClientKey) -> Option<TrackerRecord>;

    /// One reaper sweep.
    fn reap(&self) -> ReapReport;
}
