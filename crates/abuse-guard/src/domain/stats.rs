//! Introspection snapshots for admin endpoints.

use super::entities::{ClientKey, Timestamp};
use serde::Serialize;

/// Snapshot of the whole tracker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardStats {
    pub total_tracked: usize,
    pub blocked_count: usize,
    pub per_client: Vec<ClientStats>,
}

/// One tracked client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStats {
    pub key: ClientKey,
    pub failure_count: u32,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_until: Option<Timestamp>,
    pub offense_count: u32,
}

/// Result of one reaper sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReapReport {
    pub scanned: usize,
    pub removed: usize,
}
