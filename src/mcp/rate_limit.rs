//! Request Rate Limiting
//!
//! Fixed-window limiter keyed by client network identifier. Consulted by the
//! tool invoker before any upstream call, and only when the server runs in
//! production mode. Expired windows are reclaimed by the periodic sweep
//! alongside idle sessions.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::mcp::error::McpError;

#[derive(Debug, Clone)]
struct WindowState {
    count: u32,
    window_reset: Instant,
}

/// Fixed-window rate limiter.
///
/// Injected through application state rather than held globally, so routers
/// built in different tests never share counters.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, WindowState>>,
    max_requests: u32,
    window: Duration,
    enabled: bool,
}

impl RateLimiter {
    /// Create a new rate limiter.
    ///
    /// A disabled limiter admits every request; the server passes
    /// `enabled = false` outside production mode.
    pub fn new(max_requests: u32, window: Duration, enabled: bool) -> Self {
        Self { windows: Mutex::new(HashMap::new()), max_requests, window, enabled }
    }

    /// Check whether the caller is within budget, counting this request.
    ///
    /// Returns `McpError::RateLimited` carrying the window reset time when
    /// the budget is exhausted.
    pub async fn check(&self, key: &str) -> Result<(), McpError> {
        if !self.enabled {
            return Ok(());
        }

        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let state = windows
            .entry(key.to_string())
            .or_insert_with(|| WindowState { count: 0, window_reset: now + self.window });

        if now >= state.window_reset {
            state.count = 0;
            state.window_reset = now + self.window;
        }

        if state.count >= self.max_requests {
            let remaining = state.window_reset.saturating_duration_since(now);
            let reset_at = Utc::now()
                + chrono::Duration::from_std(remaining).unwrap_or_else(|_| chrono::Duration::zero());
            warn!(
                client = %key,
                reset_at = %reset_at,
                "Rate limit exceeded"
            );
            return Err(McpError::RateLimited { reset_at });
        }

        state.count += 1;
        debug!(client = %key, count = state.count, "Rate limit check passed");
        Ok(())
    }

    /// Drop windows that have already elapsed.
    ///
    /// Returns the number of entries removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, state| now < state.window_reset);
        before - windows.len()
    }

    /// Number of live rate-limit windows
    pub async fn total_windows(&self) -> usize {
        self.windows.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allows_within_limit() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60), true);

        for i in 0..5 {
            assert!(limiter.check("10.0.0.1").await.is_ok(), "request {} should pass", i + 1);
        }
    }

    #[tokio::test]
    async fn test_blocks_over_limit_with_reset_time() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60), true);

        for _ in 0..3 {
            limiter.check("10.0.0.2").await.unwrap();
        }

        let before = Utc::now();
        match limiter.check("10.0.0.2").await {
            Err(McpError::RateLimited { reset_at }) => {
                assert!(reset_at >= before, "reset time must not be in the past");
            }
            other => panic!("expected RateLimited, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_isolates_clients() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60), true);

        limiter.check("10.0.0.3").await.unwrap();
        assert!(limiter.check("10.0.0.3").await.is_err());
        assert!(limiter.check("10.0.0.4").await.is_ok());
    }

    #[tokio::test]
    async fn test_window_resets() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20), true);

        limiter.check("10.0.0.5").await.unwrap();
        assert!(limiter.check("10.0.0.5").await.is_err());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.check("10.0.0.5").await.is_ok(), "window should have reset");
    }

    #[tokio::test]
    async fn test_disabled_limiter_admits_everything() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60), false);

        for _ in 0..10 {
            assert!(limiter.check("10.0.0.6").await.is_ok());
        }
        assert_eq!(limiter.total_windows().await, 0);
    }

    #[tokio::test]
    async fn test_cleanup_expired_windows() {
        let limiter = RateLimiter::new(5, Duration::from_millis(10), true);

        limiter.check("a").await.unwrap();
        limiter.check("b").await.unwrap();
        assert_eq!(limiter.total_windows().await, 2);

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(limiter.cleanup_expired().await, 2);
        assert_eq!(limiter.total_windows().await, 0);
    }
}
