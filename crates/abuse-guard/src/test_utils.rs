//! Test utilities for the guard.
//!
//! Deterministic doubles for the outbound ports. Enable with the
//! `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust,ignore
//! use abuse_guard::test_utils::ManualTimeSource;
//! use abuse_guard::TimeSource;
//! use std::time::Duration;
//!
//! let clock = ManualTimeSource::at_secs(1000);
//! clock.advance(Duration::from_secs(5));
//! assert_eq!(clock.now().as_millis(), 1_005_000);
//! ```

use crate::domain::{AuditEvent, ClientKey, StoreError, Timestamp, TrackerRecord};
use crate::ports::{AuditSink, RecordUpdate, TimeSource, TrackerStore};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualTimeSource {
    millis: AtomicU64,
}

impl ManualTimeSource {
    pub fn at_millis(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    pub fn at_secs(secs: u64) -> Self {
        Self::at_millis(secs.saturating_mul(1000))
    }

    pub fn advance(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set(&self, at: Timestamp) {
        self.millis.store(at.as_millis(), Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

/// Audit sink that keeps every event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl AuditSink for RecordingAuditSink {
    fn emit(&self, event: &AuditEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Store whose every call fails, for fail-open tests.
#[derive(Debug, Clone)]
pub struct FailingTrackerStore {
    message: String,
}

impl FailingTrackerStore {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn err(&self) -> StoreError {
        StoreError::Unavailable(self.message.clone())
    }
}

impl Default for FailingTrackerStore {
    fn default() -> Self {
        Self::new("backend offline")
    }
}

impl TrackerStore for FailingTrackerStore {
    fn get(&self, _key: &ClientKey) -> Result<Option<TrackerRecord>, StoreError> {
        Err(self.err())
    }

    fn set(&self, _key: ClientKey, _record: TrackerRecord) -> Result<(), StoreError> {
        Err(self.err())
    }

    fn delete(&self, _key: &ClientKey) -> Result<bool, StoreError> {
        Err(self.err())
    }

    fn delete_if(
        &self,
        _key: &ClientKey,
        _predicate: &dyn Fn(&TrackerRecord) -> bool,
    ) -> Result<bool, StoreError> {
        Err(self.err())
    }

    fn update(
        &self,
        _key: &ClientKey,
        _apply: RecordUpdate<'_>,
    ) -> Result<Option<TrackerRecord>, StoreError> {
        Err(self.err())
    }

    fn scan(&self) -> Result<Vec<(ClientKey, TrackerRecord)>, StoreError> {
        Err(self.err())
    }

    fn len(&self) -> Result<usize, StoreError> {
        Err(self.err())
    }
}
