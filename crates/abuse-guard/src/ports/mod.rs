//! Hexagonal ports: the inbound API and the outbound SPI.

pub mod inbound;
pub mod outbound;

pub use inbound::AbuseGuardApi;
pub use outbound::{AuditSink, RecordUpdate, TimeSource, TrackerStore};
