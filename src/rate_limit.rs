use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
};
use tracing::{debug, warn};

use crate::config::RateLimitConfig;
use crate::error::AppError;
use crate::metrics::track_rate_limit_rejection;
use crate::server::Server;

/// Per-client-IP request limiter
pub struct RateLimitService {
    enabled: bool,
    requests_per_minute: u32,
    trust_proxy_headers: bool,
    limiter: DefaultKeyedRateLimiter<IpAddr>,
}

impl RateLimitService {
    pub fn new(config: &RateLimitConfig) -> Self {
        let rpm = NonZeroU32::new(config.requests_per_minute).unwrap_or(nonzero!(1u32));

        Self {
            enabled: config.enabled,
            requests_per_minute: rpm.get(),
            trust_proxy_headers: config.trust_proxy_headers,
            limiter: RateLimiter::keyed(Quota::per_minute(rpm)),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute
    }

    pub fn trusts_proxy_headers(&self) -> bool {
        self.trust_proxy_headers
    }

    /// Check if a request from `ip` is within its quota
    pub fn check(&self, ip: IpAddr) -> Result<(), RateLimitError> {
        if !self.enabled {
            return Ok(());
        }

        match self.limiter.check_key(&ip) {
            Ok(()) => {
                debug!(ip = %ip, "Rate limit check passed");
                Ok(())
            }
            Err(_) => {
                warn!(ip = %ip, "Rate limit exceeded");
                track_rate_limit_rejection();
                Err(RateLimitError::LimitExceeded)
            }
        }
    }

    /// Drop state for clients whose quota has fully replenished
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded. Please try again later.")]
    LimitExceeded,
}

impl From<RateLimitError> for AppError {
    fn from(err: RateLimitError) -> Self {
        AppError::TooManyRequests(err.to_string())
    }
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

/// Client IP used as the rate-limit key.
///
/// Without `trust_proxy_headers` only the socket peer counts. With it:
/// `X-Real-IP`, then the first `X-Forwarded-For` hop, then the socket peer.
pub fn extract_ip(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    trust_proxy_headers: bool,
) -> Option<IpAddr> {
    let peer = connect_info.map(|info| info.0.ip());
    if !trust_proxy_headers {
        return peer;
    }

    let real_ip = headers
        .get("X-Real-IP")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok());
    if real_ip.is_some() {
        return real_ip;
    }

    let forwarded = headers
        .get("X-Forwarded-For")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse().ok());
    if forwarded.is_some() {
        return forwarded;
    }

    peer
}

/// Requests whose client IP cannot be determined pass through unlimited
pub async fn rate_limit_middleware(
    State(server): State<Server>,
    req: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let ip = extract_ip(
        req.headers(),
        req.extensions().get::<ConnectInfo<SocketAddr>>(),
        server.rate_limiter.trusts_proxy_headers(),
    );

    if let Some(ip) = ip {
        server.rate_limiter.check(ip)?;
    }

    Ok(next.run(req).await)
}
