// Rate limiting for the HTTP surface

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::ErrorBody;

/// Per-client token bucket state
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket limiter keyed by client IP. Clones share state.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

struct RateLimiterInner {
    buckets: DashMap<IpAddr, Bucket>,
    /// Burst capacity
    capacity: f64,
    /// Tokens added per second
    refill_rate: f64,
}

impl RateLimiter {
    /// `requests_per_second` is the sustained rate, `burst` the bucket size
    pub fn new(requests_per_second: f64, burst: f64) -> Self {
        Self {
            inner: Arc::new(RateLimiterInner {
                buckets: DashMap::new(),
                capacity: burst.max(1.0),
                refill_rate: requests_per_second,
            }),
        }
    }

    /// Take one token for `ip`; false when its bucket is empty
    pub fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut bucket = self.inner.buckets.entry(ip).or_insert_with(|| Bucket {
            tokens: self.inner.capacity,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.inner.refill_rate).min(self.inner.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Drop buckets untouched for `idle`. Returns how many were dropped.
    pub fn purge_idle(&self, idle: Duration) -> usize {
        let now = Instant::now();
        let before = self.inner.buckets.len();
        self.inner
            .buckets
            .retain(|_, bucket| now.duration_since(bucket.last_refill) < idle);
        before.saturating_sub(self.inner.buckets.len())
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.inner.buckets.len()
    }
}

/// Reject requests over the client's budget with `429 { error }`.
///
/// The client is the leftmost `X-Forwarded-For` address when present,
/// else the peer address, else loopback.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(&request).unwrap_or(IpAddr::from([127, 0, 0, 1]));

    if limiter.check(ip) {
        next.run(request).await
    } else {
        tracing::warn!(ip = %ip, "Rate limit exceeded");
        let body = ErrorBody {
            error: "too many requests, slow down".to_string(),
        };
        (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
    }
}

fn client_ip(request: &Request<Body>) -> Option<IpAddr> {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());

    forwarded.or_else(|| {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(a, b, c, d))
    }

    #[test]
    fn test_rate_limiter_blocks_over_burst() {
        let limiter = RateLimiter::new(1.0, 3.0);
        let client = ip(1, 2, 3, 4);

        assert!(limiter.check(client));
        assert!(limiter.check(client));
        assert!(limiter.check(client));
        assert!(!limiter.check(client));
    }

    #[test]
    fn test_rate_limiter_clients_independent() {
        let limiter = RateLimiter::new(1.0, 2.0);
        let alice = ip(1, 1, 1, 1);
        let bob = ip(2, 2, 2, 2);

        assert!(limiter.check(alice));
        assert!(limiter.check(alice));
        assert!(!limiter.check(alice));

        assert!(limiter.check(bob));
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_refills_over_time() {
        let limiter = RateLimiter::new(2.0, 2.0);
        let client = ip(9, 9, 9, 9);

        assert!(limiter.check(client));
        assert!(limiter.check(client));
        assert!(!limiter.check(client));

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(limiter.check(client), "one token back after half a second");
        assert!(!limiter.check(client));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_idle_drops_quiet_clients() {
        let limiter = RateLimiter::new(1.0, 5.0);
        limiter.check(ip(1, 0, 0, 1));
        tokio::time::advance(Duration::from_secs(120)).await;
        limiter.check(ip(1, 0, 0, 2));

        assert_eq!(limiter.purge_idle(Duration::from_secs(60)), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let request = Request::builder()
            .uri("/ai")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&request), Some(ip(203, 0, 113, 7)));

        let request = Request::builder().uri("/ai").body(Body::empty()).unwrap();
        assert_eq!(client_ip(&request), None);
    }
}
