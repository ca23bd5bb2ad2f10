//! Client identity resolution.
//!
//! Requests usually arrive through a reverse proxy, so the forwarded header
//! is preferred over the direct peer address. Resolution never fails: with
//! nothing to go on it yields [`ClientKey::Unknown`].

use super::config::{KeyScope, ResolverConfig};
use super::entities::ClientKey;
use std::net::{IpAddr, SocketAddr};
use tracing::debug;

/// Connection metadata handed over by the routing layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Forwarded header values, in the order they appeared
    pub forwarded_for: Vec<String>,
    /// Directly connected peer, as text
    pub peer_addr: Option<String>,
    /// Authenticated user, when an upstream layer verified one
    pub authenticated_user: Option<String>,
}

impl ConnectionInfo {
    pub fn from_peer(peer: impl Into<String>) -> Self {
        Self {
            peer_addr: Some(peer.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_forwarded(mut self, value: impl Into<String>) -> Self {
        self.forwarded_for.push(value.into());
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.authenticated_user = Some(user.into());
        self
    }
}

/// Derives a [`ClientKey`] from [`ConnectionInfo`]
#[derive(Debug, Clone, Default)]
pub struct ClientIdentityResolver {
    config: ResolverConfig,
}

impl ClientIdentityResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve the key for one request.
    pub fn resolve(&self, info: &ConnectionInfo) -> ClientKey {
        if self.config.scope == KeyScope::PreferUser {
            if let Some(user) = info
                .authenticated_user
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
            {
                return ClientKey::user(user);
            }
        }

        if let Some(forwarded) = self.forwarded_client(info) {
            return ClientKey::ip(forwarded);
        }

        match info.peer_addr.as_deref().map(str::trim) {
            Some(peer) if !peer.is_empty() => ClientKey::ip(peer),
            _ => ClientKey::Unknown,
        }
    }

    /// First entry of the forwarded chain, if the peer may set it.
    fn forwarded_client<'a>(&self, info: &'a ConnectionInfo) -> Option<&'a str> {
        let first = info
            .forwarded_for
            .iter()
            .map(|v| v.trim())
            .find(|v| !v.is_empty())?
            .split(',')
            .next()?
            .trim();

        if first.is_empty() {
            return None;
        }

        if !self.peer_is_trusted(info.peer_addr.as_deref()) {
            debug!(
                peer = ?info.peer_addr,
                forwarded = first,
                "Ignoring forwarded header from untrusted peer"
            );
            return None;
        }

        Some(first)
    }

    fn peer_is_trusted(&self, peer: Option<&str>) -> bool {
        if self.config.trusted_proxies.is_empty() {
            return true;
        }
        peer.and_then(parse_addr)
            .is_some_and(|ip| self.config.trusted_proxies.contains(&ip))
    }
}

fn parse_addr(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim();
    raw.parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<SocketAddr>().ok().map(|s| s.ip()))
        .map(|ip| ip.to_canonical())
}
