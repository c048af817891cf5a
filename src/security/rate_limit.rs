//! Per-client rate limiting middleware.
//!
//! Each client IP owns a token bucket holding `max_requests` tokens that
//! refills completely over `window_secs`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Body of every 429 response.
pub const RATE_LIMITED_MESSAGE: &str = "Rate limit exceeded";

/// A simple token bucket rate limiter.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant, capacity: f64, refill_rate: f64) {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;
    }

    fn try_acquire(&mut self, now: Instant, capacity: f64, refill_rate: f64) -> bool {
        self.refill(now, capacity, refill_rate);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared limiter state.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<IpAddr, TokenBucket>,
    capacity: f64,
    refill_rate: f64,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let capacity = f64::from(config.max_requests.max(1));
        Self {
            buckets: DashMap::new(),
            capacity,
            refill_rate: capacity / config.window_secs.max(1) as f64,
        }
    }

    /// Take one token for `client`. Returns false when the bucket is empty.
    pub fn check(&self, client: IpAddr) -> bool {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> bool {
        self.buckets
            .entry(client)
            .or_insert_with(|| TokenBucket::new(self.capacity))
            .try_acquire(now, self.capacity, self.refill_rate)
    }

    /// Drop buckets that have refilled completely; they are
    /// indistinguishable from a fresh one.
    pub fn prune(&self) {
        let now = Instant::now();
        self.buckets.retain(|_, bucket| {
            bucket.refill(now, self.capacity, self.refill_rate);
            bucket.tokens < self.capacity
        });
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }
}

/// Middleware rejecting clients that exhausted their bucket with `429`.
///
/// Requests without connection info (in-process tests) share the
/// unspecified address bucket.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if limiter.check(client) {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, "Rate limit exceeded");
        metrics::record_rate_limited();
        let mut response = Response::new(Body::from(RATE_LIMITED_MESSAGE));
        *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
        response
    }
}
