use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use dashmap::{DashMap, mapref::entry::Entry};

use crate::errors::AppError;
use crate::logging::{SanitizedIpAddr, SecurityEvent};

/// Tracked clients before expired windows are swept.
const SWEEP_THRESHOLD: usize = 4096;

/// Fixed-window limiter keyed by client IP.
#[derive(Clone)]
pub struct RateLimiterState {
    max_requests: u32,
    window: Duration,
    sweep_threshold: usize,
    buckets: Arc<DashMap<IpAddr, RateWindow>>,
}

#[derive(Debug)]
struct RateWindow {
    started_at: Instant,
    hits: u32,
}

impl RateLimiterState {
    pub fn new(calls: NonZeroU32, window: Duration) -> Self {
        Self {
            max_requests: calls.get(),
            window,
            sweep_threshold: SWEEP_THRESHOLD,
            buckets: Arc::new(DashMap::new()),
        }
    }

    /// Drops windows that have run out; they carry no state worth keeping.
    fn evict_expired(&self, now: Instant) {
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.started_at) < self.window);
        tracing::debug!(
            evicted = before.saturating_sub(self.buckets.len()),
            tracked = self.buckets.len(),
            "Swept expired rate limit windows"
        );
    }

    /// Records a hit, or returns how long the client must wait.
    fn register(&self, ip: IpAddr, now: Instant) -> Result<(), Duration> {
        // Must run before `entry`, which holds a shard lock that `retain` needs.
        if self.buckets.len() >= self.sweep_threshold {
            self.evict_expired(now);
        }

        match self.buckets.entry(ip) {
            Entry::Occupied(mut entry) => {
                let bucket = entry.get_mut();
                let elapsed = now.duration_since(bucket.started_at);

                if elapsed >= self.window {
                    bucket.started_at = now;
                    bucket.hits = 0;
                }

                if bucket.hits >= self.max_requests {
                    let elapsed = now.duration_since(bucket.started_at);
                    return Err(self.window.saturating_sub(elapsed));
                }

                bucket.hits += 1;
                Ok(())
            }
            Entry::Vacant(entry) => {
                entry.insert(RateWindow {
                    started_at: now,
                    hits: 1,
                });
                Ok(())
            }
        }
    }
}

pub async fn enforce_rate_limit(
    State(state): State<RateLimiterState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client_ip = select_client_ip(request.headers(), addr.ip());

    if let Err(retry_after) = state.register(client_ip, Instant::now()) {
        crate::log_security_event!(
            SecurityEvent::RateLimitExceeded,
            client_ip = %SanitizedIpAddr::new(client_ip),
            path = %request.uri().path(),
            "Rate limit exceeded for client"
        );

        return Err(AppError::RateLimitExceeded {
            retry_after: Some(retry_after.max(Duration::from_secs(1))),
        });
    }

    Ok(next.run(request).await)
}

fn select_client_ip(headers: &HeaderMap, fallback: IpAddr) -> IpAddr {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .and_then(|ip| ip.trim().parse().ok());

    forwarded.or(real_ip).unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn limiter(calls: u32, window_secs: u64) -> RateLimiterState {
        RateLimiterState::new(
            NonZeroU32::new(calls).unwrap(),
            Duration::from_secs(window_secs),
        )
    }

    #[test]
    fn test_window_allows_burst_then_blocks() {
        let state = limiter(2, 60);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let now = Instant::now();

        assert!(state.register(ip, now).is_ok());
        assert!(state.register(ip, now).is_ok());
        let retry = state.register(ip, now + Duration::from_secs(10)).unwrap_err();
        assert_eq!(retry, Duration::from_secs(50));

        let other: IpAddr = "10.0.0.2".parse().unwrap();
        assert!(state.register(other, now).is_ok());
    }

    #[test]
    fn test_window_resets() {
        let state = limiter(1, 60);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let now = Instant::now();

        assert!(state.register(ip, now).is_ok());
        assert!(state.register(ip, now).is_err());
        assert!(state.register(ip, now + Duration::from_secs(61)).is_ok());
    }

    #[test]
    fn test_expired_windows_are_swept() {
        let mut state = limiter(1, 60);
        state.sweep_threshold = 50;
        let now = Instant::now();

        for n in 0..50u8 {
            let ip = IpAddr::from([198, 51, 100, n]);
            assert!(state.register(ip, now).is_ok());
        }
        assert_eq!(state.buckets.len(), 50);

        let fresh: IpAddr = "203.0.113.9".parse().unwrap();
        assert!(state.register(fresh, now + Duration::from_secs(61)).is_ok());
        assert_eq!(state.buckets.len(), 1);
        assert!(state.buckets.contains_key(&fresh));
    }

    #[test]
    fn test_sweep_keeps_live_windows() {
        let mut state = limiter(1, 60);
        state.sweep_threshold = 2;
        let now = Instant::now();
        let old: IpAddr = "10.0.0.1".parse().unwrap();
        let recent: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(state.register(old, now).is_ok());
        assert!(state.register(recent, now + Duration::from_secs(30)).is_ok());
        assert!(
            state
                .register("10.0.0.3".parse().unwrap(), now + Duration::from_secs(70))
                .is_ok()
        );

        assert!(!state.buckets.contains_key(&old));
        // Still inside its window, so still limited.
        assert!(state.register(recent, now + Duration::from_secs(70)).is_err());
    }

    #[test]
    fn test_forwarded_headers_take_precedence() {
        let fallback: IpAddr = "127.0.0.1".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(select_client_ip(&headers, fallback), fallback);

        headers.insert("x-real-ip", HeaderValue::from_static("192.0.2.7"));
        assert_eq!(
            select_client_ip(&headers, fallback),
            "192.0.2.7".parse::<IpAddr>().unwrap()
        );

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.5, 10.0.0.1"),
        );
        assert_eq!(
            select_client_ip(&headers, fallback),
            "203.0.113.5".parse::<IpAddr>().unwrap()
        );
    }
}
