//! Per-client rate limiting keyed by client address.
//!
//! Each bucket is a keyed GCRA limiter from `governor`: a client may burst up
//! to `max_requests` and regains one request every `window / max_requests`.

use std::{
    net::SocketAddr,
    num::NonZeroU32,
    sync::atomic::{AtomicU64, Ordering},
    sync::Arc,
    time::Duration,
};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use governor::{
    clock::{Clock, DefaultClock},
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter as GovernorLimiter,
};
use supportdesk_config::RateLimitConfig;
use tracing::warn;

use crate::{ApiError, AppState};

pub const API_LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";
pub const AUTH_LIMIT_MESSAGE: &str = "Too many authentication attempts, please try again later.";
pub const CHAT_LIMIT_MESSAGE: &str = "Too many messages. Please wait a moment before sending more.";

/// Stale keys are dropped once every this many checks.
const PRUNE_EVERY: u64 = 1024;

type KeyedLimiter = GovernorLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<KeyedLimiter>,
    clock: DefaultClock,
    checks: Arc<AtomicU64>,
    max_requests: u32,
    message: &'static str,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32, message: &'static str) -> Self {
        let clock = DefaultClock::default();
        let limiter = GovernorLimiter::new(
            quota(window, max_requests),
            DefaultKeyedStateStore::default(),
            clock.clone(),
        );
        Self {
            limiter: Arc::new(limiter),
            clock,
            checks: Arc::new(AtomicU64::new(0)),
            max_requests,
            message,
        }
    }

    /// Count one request for `key`. Returns how long the client has to wait
    /// when it is over the limit.
    pub fn hit(&self, key: &str) -> Result<(), Duration> {
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.limiter.retain_recent();
        }

        self.limiter
            .check_key(&key.to_string())
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    fn enforce(&self, request: &Request) -> Result<(), ApiError> {
        let key = client_key(request);
        self.hit(&key).map_err(|wait| {
            warn!(client = %key, max_requests = self.max_requests, "rate limit exceeded");
            ApiError::too_many_requests(self.message, retry_after_secs(wait))
        })
    }
}

/// `max_requests` per `window`, all of them available as a burst.
fn quota(window: Duration, max_requests: u32) -> Quota {
    let burst = NonZeroU32::new(max_requests.max(1)).unwrap_or(NonZeroU32::MIN);
    Quota::with_period(window / burst.get())
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs();
    if wait.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs.max(1)
    }
}

/// The three buckets applied by the router.
#[derive(Clone)]
pub struct RateLimiters {
    pub api: RateLimiter,
    pub auth: RateLimiter,
    pub chat: RateLimiter,
}

impl RateLimiters {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            api: RateLimiter::new(
                Duration::from_secs(config.window_seconds),
                config.max_requests,
                API_LIMIT_MESSAGE,
            ),
            auth: RateLimiter::new(
                Duration::from_secs(config.auth_window_seconds),
                config.auth_max_requests,
                AUTH_LIMIT_MESSAGE,
            ),
            chat: RateLimiter::new(
                Duration::from_secs(config.chat_window_seconds),
                config.chat_max_requests,
                CHAT_LIMIT_MESSAGE,
            ),
        }
    }
}

/// Peer address when the server exposes it, else the first forwarded hop.
pub fn client_key(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn limit_api(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    state.rate_limits().api.enforce(&request)?;
    Ok(next.run(request).await)
}

pub async fn limit_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    state.rate_limits().auth.enforce(&request)?;
    Ok(next.run(request).await)
}

pub async fn limit_chat(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    state.rate_limits().chat.enforce(&request)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use tokio::time::sleep;

    #[test]
    fn limiter_blocks_after_max_requests_per_key() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 2, API_LIMIT_MESSAGE);

        assert!(limiter.hit("10.0.0.1").is_ok());
        assert!(limiter.hit("10.0.0.1").is_ok());
        let wait = limiter.hit("10.0.0.1").expect_err("third hit is limited");
        assert!(wait <= Duration::from_secs(30));
        assert!(wait > Duration::ZERO);

        assert!(limiter.hit("10.0.0.2").is_ok());
    }

    #[tokio::test]
    async fn capacity_returns_after_the_window() {
        let limiter = RateLimiter::new(Duration::from_millis(20), 1, CHAT_LIMIT_MESSAGE);
        assert!(limiter.hit("client").is_ok());
        assert!(limiter.hit("client").is_err());

        sleep(Duration::from_millis(40)).await;

        assert!(limiter.hit("client").is_ok());
    }

    #[test]
    fn zero_max_requests_still_admits_one() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 0, API_LIMIT_MESSAGE);
        assert!(limiter.hit("client").is_ok());
        assert!(limiter.hit("client").is_err());
    }

    #[test]
    fn retry_after_rounds_up_to_whole_seconds() {
        assert_eq!(retry_after_secs(Duration::from_millis(1)), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(1500)), 2);
        assert_eq!(retry_after_secs(Duration::from_secs(30)), 30);
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
    }

    #[test]
    fn client_key_prefers_forwarded_header_without_connect_info() {
        let request = HttpRequest::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "203.0.113.9");

        let request = HttpRequest::builder().body(Body::empty()).unwrap();
        assert_eq!(client_key(&request), "unknown");
    }

    #[test]
    fn client_key_uses_peer_address() {
        let mut request = HttpRequest::builder()
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap();
        let addr: SocketAddr = "192.0.2.4:5555".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(client_key(&request), "192.0.2.4");
    }
}
