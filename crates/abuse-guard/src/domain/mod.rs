//! Domain types for the guard.
//!
//! Pure data and decision logic. Nothing in here touches clocks, locks or I/O;
//! the current time is always passed in.

pub mod config;
pub mod decision;
pub mod entities;
pub mod errors;
pub mod events;
pub mod identity;
pub mod outcome;
pub mod record;
pub mod stats;

pub use config::{ConfigError, GuardConfig, KeyScope, ReaperConfig, ResolverConfig};
pub use decision::{block_duration, evaluate, BlockTransition, Evaluation};
pub use entities::{duration_millis, ClientKey, Timestamp};
pub use errors::{BlockedError, BlockedPayload, GuardError, StoreError};
pub use events::{AuditEvent, AuditEventType};
pub use identity::{ClientIdentityResolver, ConnectionInfo};
pub use outcome::Outcome;
pub use record::TrackerRecord;
pub use stats::{ClientStats, GuardStats, ReapReport};
