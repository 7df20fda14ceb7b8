use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::ApiResponse;

// ── Configuration ──

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Public,
    Admin,
}

// ── Core rate limiter ──

/// In-memory per-IP fixed-window counters, one window per (tier, ip).
#[derive(Clone)]
pub struct RateLimiter {
    public: RateLimitConfig,
    admin: RateLimitConfig,
    windows: Arc<DashMap<(Tier, IpAddr), (Instant, u32)>>,
}

impl RateLimiter {
    pub fn new(public: RateLimitConfig, admin: RateLimitConfig) -> Self {
        Self {
            public,
            admin,
            windows: Arc::new(DashMap::new()),
        }
    }

    fn config(&self, tier: Tier) -> RateLimitConfig {
        match tier {
            Tier::Public => self.public,
            Tier::Admin => self.admin,
        }
    }

    /// Returns `Ok(())` if allowed, `Err(retry_after_secs)` if limited.
    pub fn check(&self, tier: Tier, ip: IpAddr) -> Result<(), u64> {
        let config = self.config(tier);
        let now = Instant::now();
        let mut entry = self.windows.entry((tier, ip)).or_insert((now, 0));
        let window = entry.value_mut();

        if now.duration_since(window.0) >= config.window {
            *window = (now, 1);
            return Ok(());
        }
        if window.1 >= config.max_requests {
            let retry_after = (config.window - now.duration_since(window.0))
                .as_secs()
                .max(1);
            return Err(retry_after);
        }
        window.1 += 1;
        Ok(())
    }

    /// Drop windows that closed long ago. Call periodically from a
    /// background task.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let horizon = self.public.window.max(self.admin.window) * 2;
        self.windows
            .retain(|_, (started, _)| now.duration_since(*started) < horizon);
    }
}

// ── IP extraction ──

/// Client IP from X-Forwarded-For (reverse proxy) or ConnectInfo.
pub fn extract_client_ip(req: &Request) -> IpAddr {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            if let Ok(ip) = first.trim().parse::<IpAddr>() {
                return ip;
            }
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
        .unwrap_or_else(|| "127.0.0.1".parse().unwrap())
}

fn too_many_requests(retry_after: u64) -> Response {
    let body = ApiResponse::<()>::error(format!(
        "Too many requests. Try again in {} seconds",
        retry_after
    ));
    (
        StatusCode::TOO_MANY_REQUESTS,
        [("Retry-After", retry_after.to_string())],
        Json(body),
    )
        .into_response()
}

// ── Middleware ──

pub async fn rate_limit_public(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_client_ip(&req);
    limiter.check(Tier::Public, ip).map_err(too_many_requests)?;
    Ok(next.run(req).await)
}

pub async fn rate_limit_admin(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_client_ip(&req);
    limiter.check(Tier::Admin, ip).map_err(too_many_requests)?;
    Ok(next.run(req).await)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::thread::sleep;

    fn limiter(max: u32, window: Duration) -> RateLimiter {
        let config = RateLimitConfig {
            max_requests: max,
            window,
        };
        RateLimiter::new(config, config)
    }

    fn test_ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn allows_requests_under_limit() {
        let limiter = limiter(3, Duration::from_secs(60));
        let ip = test_ip(1);
        assert!(limiter.check(Tier::Public, ip).is_ok());
        assert!(limiter.check(Tier::Public, ip).is_ok());
        assert!(limiter.check(Tier::Public, ip).is_ok());
    }

    #[test]
    fn rejects_over_limit_with_retry_after() {
        let limiter = limiter(1, Duration::from_secs(60));
        let ip = test_ip(1);
        assert!(limiter.check(Tier::Public, ip).is_ok());
        let retry_after = limiter.check(Tier::Public, ip).unwrap_err();
        assert!((1..=60).contains(&retry_after));
    }

    #[test]
    fn different_ips_are_independent() {
        let limiter = limiter(1, Duration::from_secs(60));
        assert!(limiter.check(Tier::Public, test_ip(1)).is_ok());
        assert!(limiter.check(Tier::Public, test_ip(1)).is_err());
        assert!(limiter.check(Tier::Public, test_ip(2)).is_ok());
    }

    #[test]
    fn tiers_are_independent() {
        let limiter = limiter(1, Duration::from_secs(60));
        let ip = test_ip(1);
        assert!(limiter.check(Tier::Public, ip).is_ok());
        assert!(limiter.check(Tier::Public, ip).is_err());
        assert!(limiter.check(Tier::Admin, ip).is_ok());
    }

    #[test]
    fn window_expiry_resets_the_counter() {
        let limiter = limiter(1, Duration::from_millis(50));
        let ip = test_ip(1);
        assert!(limiter.check(Tier::Public, ip).is_ok());
        assert!(limiter.check(Tier::Public, ip).is_err());

        sleep(Duration::from_millis(80));

        assert!(limiter.check(Tier::Public, ip).is_ok());
    }

    #[test]
    fn cleanup_drops_stale_windows_only() {
        let limiter = limiter(2, Duration::from_millis(40));
        limiter.check(Tier::Public, test_ip(1)).unwrap();

        sleep(Duration::from_millis(120)); // past 2× window

        limiter.check(Tier::Public, test_ip(2)).unwrap();
        limiter.cleanup();

        assert!(limiter.windows.get(&(Tier::Public, test_ip(1))).is_none());
        assert!(limiter.windows.get(&(Tier::Public, test_ip(2))).is_some());
    }
}
