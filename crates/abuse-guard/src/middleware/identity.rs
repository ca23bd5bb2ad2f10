//! Request-side identity extraction.
//!
//! Gathers what the resolver needs from an HTTP request: the forwarded
//! header, the connected peer and any user an auth layer already verified.

use crate::domain::ConnectionInfo;
use axum::{extract::ConnectInfo, http::Request};
use std::net::SocketAddr;

/// Request extension set by an upstream authentication layer once it has
/// verified who is calling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

/// Collect [`ConnectionInfo`] from a request.
///
/// `forwarded_header` is the configured header name; values that are not
/// valid visible ASCII are skipped.
pub fn connection_info<B>(req: &Request<B>, forwarded_header: &str) -> ConnectionInfo {
    let forwarded_for = req
        .headers()
        .get_all(forwarded_header)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_owned)
        .collect();

    let peer_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string());

    let authenticated_user = req
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|user| user.0.clone());

    ConnectionInfo {
        forwarded_for,
        peer_addr,
        authenticated_user,
    }
}
