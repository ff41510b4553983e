use crate::error::AppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};

pub const RATELIMIT_LIMIT_HEADER: &str = "ratelimit-limit";
pub const RATELIMIT_REMAINING_HEADER: &str = "ratelimit-remaining";
pub const RATELIMIT_RESET_HEADER: &str = "ratelimit-reset";

const TOO_MANY_REQUESTS_MESSAGE: &str = "Too many requests from this IP. Please try again later.";

/// Rate limiter keyed by client IP address
pub type IpRateLimiter = Arc<FixedWindowLimiter>;

#[derive(Debug, Clone, Copy)]
struct Window {
    opened_at: Instant,
    count: u32,
}

/// Counter state reported back to the caller after a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}

/// Fixed-window request counter per client address.
///
/// A window opens on the first request from an address and lasts `window`.
/// Each address may make `max_requests` requests per window. The count is
/// updated while holding the map entry, so concurrent requests from one
/// address cannot both take the last slot.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    trust_forwarded_for: bool,
    windows: DashMap<IpAddr, Window>,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration, trust_forwarded_for: bool) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            trust_forwarded_for,
            windows: DashMap::new(),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn check_key(&self, key: IpAddr) -> Result<RateLimitStatus, RateLimitStatus> {
        self.check_key_at(key, Instant::now())
    }

    /// Count one request from `key` at `now`.
    ///
    /// Returns `Err` when the address has used up its window; the rejected
    /// request is not counted.
    pub fn check_key_at(
        &self,
        key: IpAddr,
        now: Instant,
    ) -> Result<RateLimitStatus, RateLimitStatus> {
        let mut entry = self.windows.entry(key).or_insert(Window {
            opened_at: now,
            count: 0,
        });

        let window = entry.value_mut();
        if now.saturating_duration_since(window.opened_at) >= self.window {
            window.opened_at = now;
            window.count = 0;
        }

        let reset_after = self
            .window
            .saturating_sub(now.saturating_duration_since(window.opened_at));

        if window.count >= self.max_requests {
            return Err(RateLimitStatus {
                limit: self.max_requests,
                remaining: 0,
                reset_after,
            });
        }

        window.count += 1;
        Ok(RateLimitStatus {
            limit: self.max_requests,
            remaining: self.max_requests - window.count,
            reset_after,
        })
    }

    /// Drop windows that have expired. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&self, now: Instant) -> usize {
        // Counted per removal: other requests may insert while this runs.
        let mut purged = 0;
        self.windows.retain(|_, w| {
            let live = now.saturating_duration_since(w.opened_at) < self.window;
            if !live {
                purged += 1;
            }
            live
        });
        purged
    }

    pub fn tracked_addresses(&self) -> usize {
        self.windows.len()
    }

    /// Resolve the client address for a request.
    ///
    /// `X-Forwarded-For` is client-controlled, so it is only read when the
    /// limiter was built to trust a fronting proxy. Otherwise the socket
    /// peer is the key.
    pub fn client_ip(&self, request: &Request) -> Option<IpAddr> {
        let forwarded_ip = if self.trust_forwarded_for {
            request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        } else {
            None
        };

        forwarded_ip.or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
    }
}

/// Create a limiter allowing `max_requests` per `window_seconds` for each IP.
pub fn create_ip_rate_limiter(
    max_requests: u32,
    window_seconds: u64,
    trust_forwarded_for: bool,
) -> IpRateLimiter {
    Arc::new(FixedWindowLimiter::new(
        max_requests,
        Duration::from_secs(window_seconds),
        trust_forwarded_for,
    ))
}

/// Periodically drop expired windows until the runtime shuts down.
pub fn spawn_window_purger(
    limiter: IpRateLimiter,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = limiter.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "Purged expired rate limit windows");
            }
        }
    })
}

/// Human-readable window length, e.g. "1 hour" or "15 minutes".
pub fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    let (value, unit) = if secs >= 3600 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };

    if value == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", value, unit)
    }
}

fn insert_status_headers(headers: &mut HeaderMap, status: &RateLimitStatus) {
    headers.insert(RATELIMIT_LIMIT_HEADER, HeaderValue::from(status.limit));
    headers.insert(RATELIMIT_REMAINING_HEADER, HeaderValue::from(status.remaining));
    headers.insert(
        RATELIMIT_RESET_HEADER,
        HeaderValue::from(status.reset_after.as_secs()),
    );
}

/// Middleware for IP-based rate limiting
pub async fn ip_rate_limit_middleware(
    State(limiter): State<IpRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let Some(ip) = limiter.client_ip(&request) else {
        tracing::warn!("Could not determine IP for rate limiting");
        return next.run(request).await;
    };

    match limiter.check_key(ip) {
        Ok(status) => {
            let mut response = next.run(request).await;
            insert_status_headers(response.headers_mut(), &status);
            response
        }
        Err(status) => {
            tracing::warn!(client_ip = %ip, limit = status.limit, "Rate limit exceeded");
            let mut response = AppError::TooManyRequests {
                message: TOO_MANY_REQUESTS_MESSAGE.to_string(),
                retry_after_secs: status.reset_after.as_secs(),
                retry_after: describe_window(limiter.window()),
            }
            .into_response();
            insert_status_headers(response.headers_mut(), &status);
            response
        }
    }
}
