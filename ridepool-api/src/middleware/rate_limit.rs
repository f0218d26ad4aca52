use std::num::NonZeroU32;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

/// Per-identity greedy token buckets: capacity `per_minute`, refilled
/// continuously at `per_minute` tokens per minute. Buckets are created
/// lazily and live for the process lifetime; the identity space is small
/// and churn-bounded, so no eviction is done here.
pub struct ClientRateLimiter {
    buckets: DashMap<String, RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    quota: Quota,
}

impl ClientRateLimiter {
    pub fn new(per_minute: u32) -> Self {
        let per_minute =
            NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::new(50).expect("nonzero"));
        Self {
            buckets: DashMap::new(),
            quota: Quota::per_minute(per_minute),
        }
    }

    /// Consume one token for the given identity. Returns whether the
    /// request may proceed.
    pub fn try_acquire(&self, key: &str) -> bool {
        let bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| RateLimiter::direct(self.quota));
        bucket.check().is_ok()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

/// Second gate of the admission pipeline, after the blacklist and before
/// identity resolution.
pub async fn rate_limit_gate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let key = super::client_key(&req);

    if !state.limiter.try_acquire(&key) {
        warn!(client = %key, "rate limit exceeded");
        return AppError::RateLimited.into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use governor::clock::FakeRelativeClock;
    use std::time::Duration;

    #[test]
    fn fifty_first_request_in_a_minute_is_rejected() {
        let limiter = ClientRateLimiter::new(50);

        for i in 0..50 {
            assert!(limiter.try_acquire("203.0.113.7"), "request {} should pass", i + 1);
        }
        assert!(!limiter.try_acquire("203.0.113.7"));
    }

    #[test]
    fn identities_have_independent_buckets() {
        let limiter = ClientRateLimiter::new(2);

        assert!(limiter.try_acquire("a"));
        assert!(limiter.try_acquire("a"));
        assert!(!limiter.try_acquire("a"));

        assert!(limiter.try_acquire("b"));
        assert_eq!(limiter.bucket_count(), 2);
    }

    #[test]
    fn greedy_refill_restores_tokens_over_time() {
        // Drive a single bucket with a fake clock: 50/min refills one
        // token every 1.2 seconds.
        let clock = FakeRelativeClock::default();
        let bucket = RateLimiter::direct_with_clock(
            Quota::per_minute(NonZeroU32::new(50).unwrap()),
            &clock,
        );

        for _ in 0..50 {
            assert!(bucket.check().is_ok());
        }
        assert!(bucket.check().is_err());

        clock.advance(Duration::from_secs(2));
        assert!(bucket.check().is_ok());
        assert!(bucket.check().is_err());

        clock.advance(Duration::from_secs(60));
        for _ in 0..50 {
            assert!(bucket.check().is_ok());
        }
    }
}
