//! Core value types: client keys and timestamps.

use serde::{Serialize, Serializer};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Prefix used when rendering user-scoped keys.
pub const USER_KEY_PREFIX: &str = "user:";

/// Sentinel rendered when no client address is available.
pub const UNKNOWN_KEY: &str = "unknown";

/// Identity of the caller a tracker record belongs to.
///
/// IP-derived and user-derived keys live in separate variants, so they can
/// never compare equal even when their rendered text coincides (a forwarded
/// header containing `user:42` stays an `Ip` key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClientKey {
    /// Normalized IP address, or the opaque forwarded value when it does not parse
    Ip(String),
    /// Authenticated user identifier
    User(String),
    /// Neither forwarded header nor peer address was available
    Unknown,
}

impl ClientKey {
    /// Build an IP-scoped key.
    ///
    /// Values that parse as an `IpAddr` or `SocketAddr` are rendered in
    /// canonical form (port dropped, IPv4-mapped IPv6 collapsed). Anything
    /// else is kept verbatim after trimming.
    pub fn ip(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Self::Unknown;
        }
        Self::Ip(normalize_ip(trimmed))
    }

    /// Build a key from an already-parsed address.
    pub fn from_addr(addr: IpAddr) -> Self {
        Self::Ip(addr.to_canonical().to_string())
    }

    /// Build a user-scoped key.
    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }

    /// Unambiguous string form for external key-value backends.
    pub fn storage_key(&self) -> String {
        match self {
            Self::Ip(ip) => format!("ip:{ip}"),
            Self::User(id) => format!("{USER_KEY_PREFIX}{id}"),
            Self::Unknown => UNKNOWN_KEY.to_string(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

fn normalize_ip(raw: &str) -> String {
    if let Ok(ip) = raw.parse::<IpAddr>() {
        return ip.to_canonical().to_string();
    }
    if let Ok(sock) = raw.parse::<SocketAddr>() {
        return sock.ip().to_canonical().to_string();
    }
    raw.to_string()
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip(ip) => write!(f, "{ip}"),
            Self::User(id) => write!(f, "{USER_KEY_PREFIX}{id}"),
            Self::Unknown => write!(f, "{UNKNOWN_KEY}"),
        }
    }
}

impl Serialize for ClientKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Milliseconds since the Unix epoch.
///
/// All arithmetic saturates; a clock that runs backwards yields zero-length
/// durations instead of panicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Self = Self(0);

    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Timestamp `duration` later, saturating at `u64::MAX`.
    pub fn saturating_add(&self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration_millis(duration)))
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Whole milliseconds in `duration`, clamped to `u64`.
pub fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
