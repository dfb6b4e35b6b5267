//! Fixed-window request limiter keyed by client address

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use parking_lot::RwLock;

use super::client::ClientInfo;
use crate::error::ApiError;

#[derive(Debug, Clone)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// At most `max_requests` per key in every `window`
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    /// Key on forwarded headers instead of the peer address
    trust_proxy: bool,
    entries: RwLock<HashMap<String, WindowEntry>>,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            trust_proxy: false,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Only enable behind a reverse proxy that overwrites `X-Forwarded-For`
    pub fn trust_forwarded_headers(mut self, trust: bool) -> Self {
        self.trust_proxy = trust;
        self
    }

    /// Count one request for `key`
    pub fn check(&self, key: &str) -> Result<(), ApiError> {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> Result<(), ApiError> {
        let mut entries = self.entries.write();

        let entry = entries.entry(key.to_string()).or_insert(WindowEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= self.max_requests {
            return Err(ApiError::TooManyRequests);
        }

        entry.count += 1;
        Ok(())
    }

    /// Drop entries whose window has ended
    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(Instant::now())
    }

    fn cleanup_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.window_start) < self.window);
        before - entries.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.entries.read().len()
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<FixedWindowLimiter>>,
    client: ClientInfo,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client.rate_limit_key(limiter.trust_proxy);
    if let Err(e) = limiter.check(key) {
        tracing::warn!(
            ip = %key,
            path = %request.uri().path(),
            "Rate limit exceeded"
        );
        return Err(e);
    }
    Ok(next.run(request).await)
}

/// Periodically prune expired windows
pub fn start_cleanup_task(limiter: Arc<FixedWindowLimiter>, interval: Duration) {
    tokio::spawn(async move {
        let mut interval_timer = tokio::time::interval(interval);
        loop {
            interval_timer.tick().await;
            let cleaned = limiter.cleanup_expired();
            if cleaned > 0 {
                tracing::debug!(cleaned = cleaned, "Pruned rate limit windows");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_after_cap() {
        let limiter = FixedWindowLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();
        for _ in 0..3 {
            assert!(limiter.check_at("10.0.0.1", now).is_ok());
        }
        assert!(matches!(
            limiter.check_at("10.0.0.1", now),
            Err(ApiError::TooManyRequests)
        ));
        // other clients have their own window
        assert!(limiter.check_at("10.0.0.2", now).is_ok());
    }

    #[test]
    fn test_window_resets() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.check_at("ip", start).is_ok());
        assert!(limiter.check_at("ip", start + Duration::from_secs(30)).is_err());
        assert!(limiter.check_at("ip", start + Duration::from_secs(60)).is_ok());
    }

    #[test]
    fn test_cleanup_expired() {
        let limiter = FixedWindowLimiter::new(5, Duration::from_secs(60));
        let start = Instant::now();
        limiter.check_at("old", start).unwrap();
        limiter.check_at("new", start + Duration::from_secs(50)).unwrap();

        assert_eq!(limiter.cleanup_expired_at(start + Duration::from_secs(70)), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
