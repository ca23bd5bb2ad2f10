//! HTTP enforcement adapter for axum/tower stacks.
//!
//! ```ignore
//! let guard = Arc::new(AbuseGuardService::new(GuardConfig::default())?);
//! let app = Router::new()
//!     .route("/login", post(login))
//!     .layer(AbuseGuardLayer::new(Arc::clone(&guard)));
//! ```

pub mod enforcement;
pub mod identity;

pub use enforcement::{AbuseGuardLayer, AbuseGuardMiddleware, AuthSignal, FailureReason};
pub use identity::{connection_info, AuthenticatedUser};
