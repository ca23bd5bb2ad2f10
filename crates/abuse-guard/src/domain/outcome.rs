//! Classification of downstream results.

use std::fmt;

/// Reason recorded when a client error carries no explicit reason.
pub const DEFAULT_AUTH_FAILURE_REASON: &str = "authentication failed";

/// What the downstream handler reported for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 2xx/3xx; `authenticated` when the request carried a verified identity
    Success { authenticated: bool },
    /// Explicit signal: credentials were accepted
    AuthSucceeded,
    /// Explicit signal: credentials were rejected
    AuthFailed,
    /// 4xx-class response
    ClientError(u16),
    /// 5xx-class response; never the client's fault
    ServerError(u16),
}

impl Outcome {
    /// Classify a numeric status. An explicit authentication signal wins
    /// over the status.
    pub fn from_status(status: u16, auth_signal: Option<bool>, authenticated: bool) -> Self {
        match auth_signal {
            Some(true) => return Self::AuthSucceeded,
            Some(false) => return Self::AuthFailed,
            None => {}
        }
        match status {
            400..=499 => Self::ClientError(status),
            500..=599 => Self::ServerError(status),
            _ => Self::Success { authenticated },
        }
    }

    /// Whether this outcome counts against the client.
    pub fn is_failure(&self, exempt_statuses: &[u16]) -> bool {
        match self {
            Self::AuthFailed => true,
            Self::ClientError(status) => !exempt_statuses.contains(status),
            _ => false,
        }
    }

    /// Whether this outcome clears the client's record.
    pub fn is_authenticated_success(&self) -> bool {
        matches!(
            self,
            Self::AuthSucceeded
                | Self::Success {
                    authenticated: true
                }
        )
    }

    /// Reason text used when the caller supplied none.
    pub fn default_reason(&self) -> String {
        match self {
            Self::ClientError(status) => format!("HTTP {status}"),
            _ => DEFAULT_AUTH_FAILURE_REASON.to_string(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { authenticated } => write!(f, "success (authenticated={authenticated})"),
            Self::AuthSucceeded => write!(f, "authentication succeeded"),
            Self::AuthFailed => write!(f, "authentication failed"),
            Self::ClientError(status) => write!(f, "client error {status}"),
            Self::ServerError(status) => write!(f, "server error {status}"),
        }
    }
}
