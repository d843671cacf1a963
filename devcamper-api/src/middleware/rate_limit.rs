//! Per-client rate limiting with governor
//!
//! Clients are keyed by IP: the socket address from `ConnectInfo`, then the
//! first `x-forwarded-for` entry, then `"unknown"`.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};

use crate::config::RateLimitConfig;
use crate::error::{Error, Result};

/// Idle client entries are evicted once per this many checks
const PRUNE_EVERY: u64 = 1024;

/// Keyed GCRA limiter shared by every request
#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<DefaultKeyedRateLimiter<String>>,
    clock: DefaultClock,
    limit: u32,
    checks: Arc<AtomicU64>,
}

impl RateLimit {
    /// Build from configuration: `requests_per_period` per `period_secs`
    pub fn new(config: &RateLimitConfig) -> Result<Self> {
        let requests = NonZeroU32::new(config.requests_per_period).ok_or_else(|| {
            Error::Internal("rate_limit.requests_per_period must be positive".to_string())
        })?;
        let burst = config
            .burst
            .and_then(NonZeroU32::new)
            .unwrap_or(requests);
        let replenish = config.period() / requests.get();
        let quota = Quota::with_period(replenish.max(Duration::from_nanos(1)))
            .ok_or_else(|| Error::Internal("rate_limit.period_secs must be positive".to_string()))?
            .allow_burst(burst);

        Ok(Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
            clock: DefaultClock::default(),
            limit: config.requests_per_period,
            checks: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Record one request for `key`
    pub fn check(&self, key: &str) -> Result<()> {
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune();
        }
        self.limiter.check_key(&key.to_string()).map_err(|not_until| {
            let wait = not_until.wait_time_from(self.clock.now());
            Error::RateLimitExceeded {
                retry_after_secs: wait.as_secs() + u64::from(wait.subsec_nanos() > 0),
                limit: self.limit,
            }
        })
    }

    /// Forget clients whose quota has fully replenished
    pub fn prune(&self) {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        tracing::debug!(before, after = self.limiter.len(), "pruned rate limit state");
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    /// Middleware entry point
    pub async fn middleware(
        State(rate_limit): State<Self>,
        request: Request<Body>,
        next: Next,
    ) -> Result<Response> {
        let key = client_key(&request);
        if let Err(err) = rate_limit.check(&key) {
            tracing::warn!(client = %key, "rate limit exceeded");
            return Err(err);
        }

        let mut response = next.run(request).await;
        response
            .headers_mut()
            .insert("x-ratelimit-limit", HeaderValue::from(rate_limit.limit));
        Ok(response)
    }
}

/// Identify the client a request came from
pub fn client_key(request: &Request<Body>) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map_or_else(|| "unknown".to_string(), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(requests: u32) -> RateLimit {
        RateLimit::new(&RateLimitConfig {
            enabled: true,
            requests_per_period: requests,
            period_secs: 600,
            burst: None,
        })
        .unwrap()
    }

    #[test]
    fn test_burst_then_reject() {
        let rate_limit = limiter(3);
        for _ in 0..3 {
            assert!(rate_limit.check("1.2.3.4").is_ok());
        }
        match rate_limit.check("1.2.3.4") {
            Err(Error::RateLimitExceeded {
                retry_after_secs,
                limit,
            }) => {
                assert_eq!(limit, 3);
                assert!(retry_after_secs > 0 && retry_after_secs <= 200);
            }
            other => panic!("expected rate limit error, got {other:?}"),
        }
    }

    #[test]
    fn test_clients_are_independent() {
        let rate_limit = limiter(1);
        assert!(rate_limit.check("a").is_ok());
        assert!(rate_limit.check("a").is_err());
        assert!(rate_limit.check("b").is_ok());
    }

    #[test]
    fn test_client_key_sources() {
        let request = Request::builder()
            .header("x-forwarded-for", "10.0.0.1, 10.0.0.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "10.0.0.1");

        let mut request = Request::builder()
            .header("x-forwarded-for", "10.0.0.1")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 5000))));
        assert_eq!(client_key(&request), "127.0.0.1");

        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_key(&request), "unknown");
    }

    #[test]
    fn test_prune_forgets_replenished_clients() {
        let rate_limit = RateLimit::new(&RateLimitConfig {
            enabled: true,
            requests_per_period: 1,
            period_secs: 1,
            burst: None,
        })
        .unwrap();
        for ip in ["10.0.0.1", "10.0.0.2", "10.0.0.3"] {
            assert!(rate_limit.check(ip).is_ok());
        }
        assert_eq!(rate_limit.tracked_clients(), 3);

        rate_limit.prune();
        assert_eq!(rate_limit.tracked_clients(), 3);

        std::thread::sleep(Duration::from_millis(1100));
        rate_limit.prune();
        assert_eq!(rate_limit.tracked_clients(), 0);
    }

    #[test]
    fn test_zero_requests_rejected() {
        assert!(RateLimit::new(&RateLimitConfig {
            enabled: true,
            requests_per_period: 0,
            period_secs: 600,
            burst: None,
        })
        .is_err());
    }
}
