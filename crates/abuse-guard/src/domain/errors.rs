//! Error taxonomy.
//!
//! - [`BlockedError`]: the only rejection surfaced to callers.
//! - [`StoreError`]: tracking failures. Logged by the service, never propagated.
//! - [`GuardError`]: startup errors (configuration).

use super::config::ConfigError;
use super::entities::{ClientKey, Timestamp};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Machine-readable code carried in the 403 payload
pub const CLIENT_BLOCKED_CODE: &str = "CLIENT_BLOCKED";

/// Request rejected because the client serves an active block.
///
/// Non-retryable until `blocked_until`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedError {
    pub client_key: ClientKey,
    pub blocked_until: Timestamp,
    pub retry_after: Duration,
}

impl BlockedError {
    pub fn new(client_key: ClientKey, blocked_until: Timestamp, now: Timestamp) -> Self {
        Self {
            client_key,
            blocked_until,
            retry_after: blocked_until.saturating_since(now),
        }
    }

    /// Whole seconds until the block ends, rounded up.
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.retry_after.as_secs();
        if self.retry_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }

    /// Human-readable message for the response body
    pub fn message(&self) -> String {
        format!(
            "Access temporarily blocked after repeated failed requests. Retry in {} seconds.",
            self.retry_after_secs()
        )
    }

    /// JSON body returned with the 403 response
    pub fn to_payload(&self) -> BlockedPayload {
        BlockedPayload {
            error: BlockedBody {
                code: CLIENT_BLOCKED_CODE,
                message: self.message(),
                data: BlockedData {
                    blocked_until: self.blocked_until.as_millis(),
                    retry_after_secs: self.retry_after_secs(),
                },
            },
        }
    }
}

impl fmt::Display for BlockedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "client {} is blocked until {}",
            self.client_key, self.blocked_until
        )
    }
}

impl std::error::Error for BlockedError {}

/// Serialized form of a [`BlockedError`]
#[derive(Debug, Clone, Serialize)]
pub struct BlockedPayload {
    pub error: BlockedBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockedBody {
    pub code: &'static str,
    pub message: String,
    pub data: BlockedData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedData {
    /// Milliseconds since the Unix epoch
    pub blocked_until: u64,
    pub retry_after_secs: u64,
}

/// Tracker store failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Store refused to create another record
    #[error("tracker store at capacity ({capacity} records)")]
    CapacityExceeded { capacity: usize },

    /// Backend could not be reached or answered with an error
    #[error("tracker store unavailable: {0}")]
    Unavailable(String),
}

/// Top-level errors raised while building the guard
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}
