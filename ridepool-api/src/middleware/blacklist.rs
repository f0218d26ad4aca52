use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashSet;
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

/// Process-wide set of blocked client identities. No expiry; entries come
/// and go only through the admin surface.
#[derive(Default)]
pub struct Blacklist {
    blocked: DashSet<String>,
}

impl Blacklist {
    pub fn is_blocked(&self, key: &str) -> bool {
        self.blocked.contains(key)
    }

    pub fn block(&self, key: &str) {
        self.blocked.insert(key.to_string());
    }

    pub fn unblock(&self, key: &str) -> bool {
        self.blocked.remove(key).is_some()
    }

    pub fn entries(&self) -> Vec<String> {
        self.blocked.iter().map(|e| e.clone()).collect()
    }
}

/// First gate of the admission pipeline. A blocked identity is rejected
/// here, terminally: neither the rate limiter nor any business logic runs.
pub async fn blacklist_gate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let key = super::client_key(&req);

    if state.blacklist.is_blocked(&key) {
        warn!(client = %key, "blocked client rejected at blacklist gate");
        return AppError::Blocked(format!("access denied: client {key} has been blocked"))
            .into_response();
    }

    next.run(req).await
}
