use crate::error::AppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use governor::{
    clock::{Clock, DefaultClock},
    state::keyed::DashMapStateStore,
    Quota, RateLimiter,
};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};
use tokio::{task::JoinHandle, time::MissedTickBehavior};

/// Rate limiter keyed by client IP address
pub type IpRateLimiter = Arc<RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock>>;

/// Requests whose origin cannot be determined share this bucket.
pub const UNKNOWN_CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Longer windows are clamped; governor cannot represent periods near `u64` nanoseconds.
const MAX_WINDOW_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Create a keyed rate limiter allowing a burst of `attempts` requests that
/// refills one request every `window_seconds / attempts`.
pub fn create_ip_rate_limiter(attempts: u32, window_seconds: u64) -> IpRateLimiter {
    let attempts = NonZeroU32::new(attempts.max(1)).unwrap_or(NonZeroU32::MIN);
    let window_ms = window_seconds.clamp(1, MAX_WINDOW_SECONDS).saturating_mul(1000);
    let period_ms = window_ms / u64::from(attempts.get());
    let quota = Quota::with_period(Duration::from_millis(period_ms.max(1)))
        .unwrap_or_else(|| Quota::per_second(attempts))
        .allow_burst(attempts);

    Arc::new(RateLimiter::dashmap(quota))
}

/// Periodically drop clients whose quota has fully replenished.
///
/// The task holds only a weak reference and exits once the limiter is dropped.
pub fn spawn_limiter_cleanup(limiter: &IpRateLimiter, period: Duration) -> JoinHandle<()> {
    let limiter = Arc::downgrade(limiter);
    let period = period.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(limiter) = limiter.upgrade() else {
                break;
            };
            limiter.retain_recent();
            limiter.shrink_to_fit();
            tracing::debug!(tracked_clients = limiter.len(), "Pruned rate limiter state");
        }
    })
}

/// Resolve the client address: socket peer first, then the first
/// `X-Forwarded-For` hop, then [`UNKNOWN_CLIENT`].
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> IpAddr {
    if let Some(addr) = peer {
        return addr.ip();
    }

    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
        .unwrap_or(UNKNOWN_CLIENT)
}

/// Middleware for IP-based rate limiting
pub async fn ip_rate_limit_middleware(
    State(limiter): State<IpRateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(request.headers(), peer);

    match limiter.check_key(&ip) {
        Ok(_) => Ok(next.run(request).await),
        Err(negative) => {
            let wait_time = negative.wait_time_from(DefaultClock::default().now());
            tracing::warn!(
                client_ip = %ip,
                retry_after_secs = wait_time.as_secs(),
                "Rate limit exceeded"
            );
            Err(AppError::TooManyRequests(
                "Too many requests. Try again later.".to_string(),
                Some(wait_time.as_secs().max(1)),
            ))
        }
    }
}
