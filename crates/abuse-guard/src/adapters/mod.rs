//! Concrete implementations of the outbound ports.

pub mod audit;
pub mod memory_store;
pub mod time;

pub use audit::{BroadcastAuditSink, MultiAuditSink, TracingAuditSink};
pub use memory_store::InMemoryTrackerStore;
pub use time::SystemTimeSource;
