//! In-memory tracker store backed by a sharded `DashMap`.
//!
//! Per-key mutations take the shard's write lock for the duration of the
//! update, so concurrent requests from the same client serialize while
//! unrelated keys proceed in parallel.

use crate::domain::{ClientKey, StoreError, TrackerRecord};
use crate::ports::{RecordUpdate, TrackerStore};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Process-local record store
#[derive(Debug, Default)]
pub struct InMemoryTrackerStore {
    records: DashMap<ClientKey, TrackerRecord>,
    /// Maintained beside the map; `DashMap::len` would lock every shard.
    count: AtomicUsize,
    capacity: Option<usize>,
}

impl InMemoryTrackerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that refuses new keys once `capacity` records are held.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            records: DashMap::with_capacity(capacity.min(4096)),
            count: AtomicUsize::new(0),
            capacity: Some(capacity),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    fn reserve_slot(&self) -> Result<(), StoreError> {
        match self.capacity {
            None => {
                self.count.fetch_add(1, Ordering::AcqRel);
                Ok(())
            }
            Some(capacity) => self
                .count
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                    (n < capacity).then_some(n + 1)
                })
                .map(|_| ())
                .map_err(|_| StoreError::CapacityExceeded { capacity }),
        }
    }

    fn release_slot(&self) {
        self.count.fetch_sub(1, Ordering::AcqRel);
    }
}

impl TrackerStore for InMemoryTrackerStore {
    fn get(&self, key: &ClientKey) -> Result<Option<TrackerRecord>, StoreError> {
        Ok(self.records.get(key).map(|r| r.value().clone()))
    }

    fn set(&self, key: ClientKey, record: TrackerRecord) -> Result<(), StoreError> {
        match self.records.entry(key) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(record);
            }
            Entry::Vacant(vacant) => {
                self.reserve_slot()?;
                vacant.insert(record);
            }
        }
        Ok(())
    }

    fn delete(&self, key: &ClientKey) -> Result<bool, StoreError> {
        let removed = self.records.remove(key).is_some();
        if removed {
            self.release_slot();
        }
        Ok(removed)
    }

    fn delete_if(
        &self,
        key: &ClientKey,
        predicate: &dyn Fn(&TrackerRecord) -> bool,
    ) -> Result<bool, StoreError> {
        let removed = self
            .records
            .remove_if(key, |_, record| predicate(record))
            .is_some();
        if removed {
            self.release_slot();
        }
        Ok(removed)
    }

    fn update(
        &self,
        key: &ClientKey,
        apply: RecordUpdate<'_>,
    ) -> Result<Option<TrackerRecord>, StoreError> {
        match self.records.entry(key.clone()) {
            Entry::Occupied(mut occupied) => match apply(Some(occupied.get().clone())) {
                Some(next) => {
                    occupied.insert(next.clone());
                    Ok(Some(next))
                }
                None => {
                    occupied.remove();
                    self.release_slot();
                    Ok(None)
                }
            },
            Entry::Vacant(vacant) => match apply(None) {
                Some(next) => {
                    if let Err(e) = self.reserve_slot() {
                        debug!(client_key = %key, "Tracker store full, record not created");
                        return Err(e);
                    }
                    vacant.insert(next.clone());
                    Ok(Some(next))
                }
                None => Ok(None),
            },
        }
    }

    fn scan(&self) -> Result<Vec<(ClientKey, TrackerRecord)>, StoreError> {
        Ok(self
            .records
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.count.load(Ordering::Acquire))
    }
}
