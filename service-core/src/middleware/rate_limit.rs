use crate::error::AppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use governor::{
    clock::{Clock, DefaultClock},
    state::{keyed::DashMapStateStore, InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

/// Rate limiter for global/unkeyed use.
pub type UnkeyedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Rate limiter keyed by client IP address.
pub type IpRateLimiter = Arc<RateLimiter<SocketAddr, DashMapStateStore<SocketAddr>, DefaultClock>>;

/// Create an unkeyed rate limiter allowing `attempts` per `window_seconds`.
pub fn create_unkeyed_rate_limiter(attempts: u32, window_seconds: u64) -> UnkeyedRateLimiter {
    let attempts = attempts.max(1);
    let period = Duration::from_millis((window_seconds * 1000) / u64::from(attempts));
    let quota = Quota::with_period(period)
        .expect("quota period must be non-zero")
        .allow_burst(NonZeroU32::new(attempts).expect("attempts is guaranteed to be non-zero"));

    Arc::new(RateLimiter::direct(quota))
}

/// Create an IP-keyed rate limiter allowing `attempts` per `window_seconds` per address.
pub fn create_ip_rate_limiter(attempts: u32, window_seconds: u64) -> IpRateLimiter {
    let attempts = attempts.max(1);
    let period = Duration::from_millis((window_seconds * 1000) / u64::from(attempts));
    let quota = Quota::with_period(period)
        .expect("quota period must be non-zero")
        .allow_burst(NonZeroU32::new(attempts).expect("attempts is guaranteed to be non-zero"));

    Arc::new(RateLimiter::dashmap(quota))
}

/// Middleware for per-IP request rate limiting.
///
/// Honors `x-forwarded-for` (first hop) when present, falling back to the
/// socket peer address. Requests whose source cannot be determined pass
/// through with a warning rather than being dropped.
pub async fn ip_rate_limit_middleware(
    State(limiter): State<IpRateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let forwarded_ip = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<std::net::IpAddr>().ok());

    let addr = if let Some(ip) = forwarded_ip {
        Some(SocketAddr::new(ip, 0))
    } else {
        request
            .extensions()
            .get::<axum::extract::ConnectInfo<SocketAddr>>()
            .map(|axum::extract::ConnectInfo(addr)| *addr)
    };

    match addr {
        Some(addr) => match limiter.check_key(&addr) {
            Ok(_) => Ok(next.run(request).await),
            Err(negative) => {
                let wait = negative.wait_time_from(DefaultClock::default().now());
                let retry_after = chrono::Duration::from_std(wait)
                    .ok()
                    .map(|d| Utc::now() + d);
                Err(AppError::rate_limited(
                    "Too many requests from this IP. Please try again later.",
                    retry_after,
                ))
            }
        },
        None => {
            tracing::warn!("could not determine client IP for rate limiting");
            Ok(next.run(request).await)
        }
    }
}
