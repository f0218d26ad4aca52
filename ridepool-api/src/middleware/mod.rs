pub mod auth;
pub mod blacklist;
pub mod rate_limit;

use axum::extract::ConnectInfo;
use axum::http::Request;
use std::net::SocketAddr;

/// Resolve the opaque client identity used by the blacklist and rate-limit
/// gates: the first entry of `X-Forwarded-For` when the request came
/// through the reverse proxy, otherwise the transport peer address.
pub fn client_key<B>(req: &Request<B>) -> String {
    if let Some(forwarded) = req.headers().get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(first) = forwarded_str.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    // No proxy header and no connect info (only happens in tests driving
    // the router directly).
    "unknown".to_string()
}
