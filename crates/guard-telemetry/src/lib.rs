//! # Guard Telemetry
//!
//! Structured logging for processes that embed the abuse guard.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use guard_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() {
//!     init_logging(&TelemetryConfig::from_env()).expect("Failed to init logging");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GUARD_SERVICE_NAME` | `abuse-guard` | Service name in logs |
//! | `GUARD_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `GUARD_JSON_LOGS` | `false` (`true` in containers) | JSON output |

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::{env_filter, init_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),
}
