//! # Driven Ports (Outbound SPI)
//!
//! Interfaces the guard requires from its host: where records live, what
//! time it is, and where audit events go.

use crate::domain::{AuditEvent, ClientKey, StoreError, Timestamp, TrackerRecord};

/// Read-modify-write callback used by [`TrackerStore::update`].
///
/// Receives the current record (if any) and returns the record to keep;
/// `None` deletes the key.
pub type RecordUpdate<'a> = &'a mut dyn FnMut(Option<TrackerRecord>) -> Option<TrackerRecord>;

/// Storage for tracker records.
///
/// The in-memory adapter is the default. A shared key-value backend with
/// per-key atomic updates and TTLs can replace it to coordinate several
/// gateway instances.
///
/// # Thread Safety
///
/// Every method may be called concurrently from request handlers and the
/// reaper. [`update`](Self::update) and [`delete_if`](Self::delete_if) must
/// be atomic per key: no other mutation of the same key may interleave, and
/// readers never observe a partially applied update.
pub trait TrackerStore: Send + Sync {
    /// Fetch a copy of the record for `key`.
    fn get(&self, key: &ClientKey) -> Result<Option<TrackerRecord>, StoreError>;

    /// Insert or overwrite the record for `key`.
    fn set(&self, key: ClientKey, record: TrackerRecord) -> Result<(), StoreError>;

    /// Remove the record for `key`. Returns whether one existed.
    fn delete(&self, key: &ClientKey) -> Result<bool, StoreError>;

    /// Remove the record for `key` only if `predicate` holds for it at the
    /// moment of removal.
    fn delete_if(
        &self,
        key: &ClientKey,
        predicate: &dyn Fn(&TrackerRecord) -> bool,
    ) -> Result<bool, StoreError>;

    /// Atomically transform the record for `key`. Returns the stored result.
    fn update(
        &self,
        key: &ClientKey,
        apply: RecordUpdate<'_>,
    ) -> Result<Option<TrackerRecord>, StoreError>;

    /// Snapshot of every record.
    fn scan(&self) -> Result<Vec<(ClientKey, TrackerRecord)>, StoreError>;

    /// Number of records held.
    fn len(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

/// Abstract interface for time.
///
/// Enables deterministic testing by injecting controllable time sources.
pub trait TimeSource: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> Timestamp;
}

/// Destination for audit events.
///
/// Called synchronously on the request path, so implementations must not
/// block; hand the event off to a channel if delivery is slow.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: &AuditEvent);
}
