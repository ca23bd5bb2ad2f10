//! Audit events emitted on state transitions.

use super::entities::{duration_millis, ClientKey, Timestamp};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Audit event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuditEventType {
    /// A client moved into a new block
    #[serde(rename = "IP_BLOCKED")]
    IpBlocked,
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEventType::IpBlocked => write!(f, "IP_BLOCKED"),
        }
    }
}

/// Block transition record for audit trails
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    pub client_key: ClientKey,
    pub failure_count: u32,
    pub block_duration_ms: u64,
    pub reason: String,
    pub timestamp: Timestamp,
}

impl AuditEvent {
    pub fn ip_blocked(
        client_key: ClientKey,
        failure_count: u32,
        block_duration: Duration,
        reason: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            event_type: AuditEventType::IpBlocked,
            client_key,
            failure_count,
            block_duration_ms: duration_millis(block_duration),
            reason: reason.into(),
            timestamp,
        }
    }
}
