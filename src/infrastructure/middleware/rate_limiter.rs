// Rate limiter - per-client token bucket in front of the read API

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::RateLimitConfig;
use crate::error::AppError;

/// Buckets idle long enough to have refilled are swept at most this often.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Token bucket rate limiter keyed by client identifier
#[derive(Debug)]
pub struct RateLimiter {
    per_second: f64,
    burst: f64,
    state: Mutex<LimiterState>,
}

#[derive(Debug)]
struct LimiterState {
    buckets: HashMap<String, Bucket>,
    last_prune: Instant,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(per_second: u32, burst: u32) -> Self {
        Self {
            per_second: f64::from(per_second),
            burst: f64::from(burst.max(1)),
            state: Mutex::new(LimiterState {
                buckets: HashMap::new(),
                last_prune: Instant::now(),
            }),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.per_second, config.burst)
    }

    /// Take one token for `identifier`. Returns false when the bucket is empty.
    pub async fn check_rate_limit(&self, identifier: &str) -> bool {
        self.check_at(identifier, Instant::now()).await
    }

    async fn check_at(&self, identifier: &str, now: Instant) -> bool {
        let mut state = self.state.lock().await;

        if now.saturating_duration_since(state.last_prune) >= PRUNE_INTERVAL {
            self.prune(&mut state.buckets, now);
            state.last_prune = now;
        }

        let bucket = state.buckets.entry(identifier.to_string()).or_insert(Bucket {
            tokens: self.burst,
            last_refill: now,
        });

        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.per_second).min(self.burst);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Drop buckets that would be full by now; they behave like new clients.
    fn prune(&self, buckets: &mut HashMap<String, Bucket>, now: Instant) {
        if self.per_second <= 0.0 {
            return;
        }
        let full_after = self.burst / self.per_second;
        let before = buckets.len();
        buckets.retain(|_, b| {
            now.saturating_duration_since(b.last_refill).as_secs_f64() < full_after
        });
        tracing::debug!(pruned = before - buckets.len(), "rate limit buckets swept");
    }
}

/// Rejects with 429 once the client's bucket is exhausted. Clients are keyed
/// by peer IP; requests without connection info share one bucket.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if !limiter.check_rate_limit(&client).await {
        tracing::warn!(client = %client, "rate limit exceeded");
        return Err(AppError::TooManyRequests("Rate limit exceeded".to_string()));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_burst_then_reject() {
        let limiter = RateLimiter::new(1, 3);
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at("10.0.0.1", now).await);
        }
        assert!(!limiter.check_at("10.0.0.1", now).await);
    }

    #[tokio::test]
    async fn test_refill_over_time() {
        let limiter = RateLimiter::new(2, 1);
        let start = Instant::now();

        assert!(limiter.check_at("10.0.0.1", start).await);
        assert!(!limiter.check_at("10.0.0.1", start).await);
        assert!(
            limiter
                .check_at("10.0.0.1", start + Duration::from_millis(600))
                .await
        );
    }

    #[tokio::test]
    async fn test_clients_have_independent_buckets() {
        let limiter = RateLimiter::new(1, 1);
        let now = Instant::now();

        assert!(limiter.check_at("10.0.0.1", now).await);
        assert!(!limiter.check_at("10.0.0.1", now).await);
        assert!(limiter.check_at("10.0.0.2", now).await);
    }

    #[tokio::test]
    async fn test_idle_buckets_swept_on_interval_only() {
        let limiter = RateLimiter::new(1, 5);
        let start = Instant::now();

        for n in 0..50 {
            assert!(limiter.check_at(&format!("10.0.1.{}", n), start).await);
        }
        // no sweep before the interval elapses, however many clients
        let soon = start + Duration::from_secs(1);
        assert!(limiter.check_at("10.0.0.1", soon).await);
        assert_eq!(limiter.state.lock().await.buckets.len(), 51);

        // an active client keeps its bucket; idle ones are dropped
        let later = start + PRUNE_INTERVAL;
        assert!(limiter.check_at("10.0.0.1", later - Duration::from_secs(1)).await);
        assert!(limiter.check_at("10.0.0.2", later).await);
        let state = limiter.state.lock().await;
        assert_eq!(state.buckets.len(), 2);
        assert!(state.buckets.contains_key("10.0.0.1"));
        assert_eq!(state.last_prune, later);
    }
}
