//! Helpers for deriving the client origin of an HTTP request.

use axum::http::{HeaderMap, Uri};
use std::net::SocketAddr;

/// Placeholder recorded when no peer address is available.
pub const UNKNOWN_ORIGIN: &str = "unknown";

/// Resolves the client IP address.
///
/// Forwarding headers are honoured only when the deployment sits behind a
/// proxy that overwrites them (`trust_proxy_headers`).
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }

        let real_ip = headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(ip) = real_ip {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_ORIGIN.to_string())
}

/// Whether the request reached us over TLS.
pub fn is_secure(uri: &Uri, headers: &HeaderMap, trust_proxy_headers: bool) -> bool {
    if uri.scheme_str() == Some("https") {
        return true;
    }
    trust_proxy_headers
        && headers
            .get("x-forwarded-proto")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}
