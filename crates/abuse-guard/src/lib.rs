//! # Abuse Guard
//!
//! Adaptive abuse detection for request-serving stacks. Failed requests are
//! counted per client inside a sliding window; a client that crosses the
//! threshold is blocked, and every repeat offense doubles the block up to a
//! ceiling.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Enforcement Adapter (middleware, tower Layer)               │
//! │    resolve ClientKey → check → handler → on_outcome          │
//! └───────────────────────────┬──────────────────────────────────┘
//!                             │ AbuseGuardApi
//! ┌───────────────────────────┴──────────────────────────────────┐
//! │  AbuseGuardService                                           │
//! │    Failure Tracker  ─►  Block Decision Engine  ─►  AuditSink │
//! └───────────────────────────┬──────────────────────────────────┘
//!                             │ TrackerStore / TimeSource
//! ┌───────────────────────────┴──────────────────────────────────┐
//! │  InMemoryTrackerStore (DashMap)      Reaper (tokio task)     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Block expiry is lazy: `is_blocked` clears an ended block on access. The
//! reaper only bounds memory.
//!
//! ## Features
//!
//! - `http` (default) - axum/tower enforcement middleware
//! - `test-utils` - deterministic clock, recording audit sink, failing store
//!
//! ## Example
//!
//! ```rust
//! use abuse_guard::{AbuseGuardApi, AbuseGuardService, ClientKey, GuardConfig};
//!
//! let guard = AbuseGuardService::new(GuardConfig::for_testing()).unwrap();
//! let client = ClientKey::ip("203.0.113.7");
//!
//! for _ in 0..3 {
//!     guard.record_failure(&client, "bad password");
//! }
//! assert!(guard.is_blocked(&client));
//! assert!(guard.check(&client).is_err());
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

#[cfg(feature = "http")]
pub mod middleware;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-exports for public API
pub use adapters::{
    BroadcastAuditSink, InMemoryTrackerStore, MultiAuditSink, SystemTimeSource, TracingAuditSink,
};
pub use domain::{
    AuditEvent, AuditEventType, BlockedError, ClientKey, ClientStats, ConfigError,
    ConnectionInfo, Evaluation, GuardConfig, GuardError, GuardStats, KeyScope, Outcome,
    ReapReport, StoreError, Timestamp, TrackerRecord,
};
pub use metrics::{GuardMetrics, MetricsSnapshot};
pub use ports::{AbuseGuardApi, AuditSink, TimeSource, TrackerStore};
pub use service::{AbuseGuardService, Reaper};

#[cfg(feature = "http")]
pub use middleware::{AbuseGuardLayer, AuthSignal, AuthenticatedUser, FailureReason};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
