/**
 * Rate Limiter
 *
 * Fixed-window counters over three independent keyspaces. Process-local and
 * non-durable: the engine binds to loopback in its primary deployment, so a
 * restart dropping the windows is accepted.
 */
use std::collections::HashMap;
use std::sync::Mutex;

use super::error::{ApiError, ApiResult};
use super::now_ms;

/// Independent keyspaces with their own window and limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateScope {
    /// Client address, credential endpoints (register, login).
    Address,
    /// Login identifier, case-normalized (register, login).
    Login,
    /// User id, refresh only.
    User,
}

impl RateScope {
    fn limit(&self) -> u32 {
        match self {
            RateScope::Address => 5,
            RateScope::Login => 5,
            RateScope::User => 30,
        }
    }

    fn window_ms(&self) -> i64 {
        match self {
            RateScope::Address => 60_000,
            RateScope::Login => 60_000,
            RateScope::User => 300_000,
        }
    }
}

#[derive(Debug)]
struct Bucket {
    attempts: u32,
    reset_at: i64,
}

pub struct RateLimiter {
    buckets: Mutex<HashMap<(RateScope, String), Bucket>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Count an attempt against a bucket. Over the limit, the caller gets
    /// `rate-limited` with a retry-after hint in whole seconds.
    pub fn check(&self, scope: RateScope, key: &str) -> ApiResult<()> {
        self.check_at(scope, key, now_ms())
    }

    fn check_at(&self, scope: RateScope, key: &str, now: i64) -> ApiResult<()> {
        // Login identifiers are case-normalized so "Alice" and "alice"
        // share a window.
        let key = match scope {
            RateScope::Login => key.to_lowercase(),
            _ => key.to_string(),
        };

        let mut buckets = self.buckets.lock().unwrap();

        // Lazy eviction of stale windows
        buckets.retain(|_, bucket| bucket.reset_at > now);

        let bucket = buckets.entry((scope, key)).or_insert(Bucket {
            attempts: 0,
            reset_at: now + scope.window_ms(),
        });
        bucket.attempts += 1;

        if bucket.attempts <= scope.limit() {
            Ok(())
        } else {
            let retry_after_secs = (((bucket.reset_at - now) + 999) / 1000).max(1) as u64;
            tracing::warn!(
                "Rate limit hit for {:?} keyspace, retry after {}s",
                scope,
                retry_after_secs
            );
            Err(ApiError::RateLimited { retry_after_secs })
        }
    }

    /// Drop every bucket; tests depend on this.
    pub fn clear(&self) {
        self.buckets.lock().unwrap().clear();
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new();

        for _ in 0..5 {
            limiter.check_at(RateScope::Address, "10.0.0.1", 1_000).unwrap();
        }

        let err = limiter
            .check_at(RateScope::Address, "10.0.0.1", 1_000)
            .unwrap_err();
        match err {
            ApiError::RateLimited { retry_after_secs } => assert!(retry_after_secs > 0),
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn test_keyspaces_are_independent() {
        let limiter = RateLimiter::new();

        for _ in 0..5 {
            limiter.check_at(RateScope::Address, "alice", 1_000).unwrap();
        }

        // Same key in a different scope is a different bucket
        limiter.check_at(RateScope::Login, "alice", 1_000).unwrap();
        assert!(limiter.check_at(RateScope::Address, "alice", 1_000).is_err());
    }

    #[test]
    fn test_login_keys_are_case_normalized() {
        let limiter = RateLimiter::new();

        for _ in 0..5 {
            limiter.check_at(RateScope::Login, "Alice", 1_000).unwrap();
        }

        assert!(limiter.check_at(RateScope::Login, "alice", 1_000).is_err());
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let limiter = RateLimiter::new();

        for _ in 0..5 {
            limiter.check_at(RateScope::Login, "alice", 1_000).unwrap();
        }
        assert!(limiter.check_at(RateScope::Login, "alice", 1_000).is_err());

        // Past reset_at the stale bucket is evicted and counting restarts
        limiter.check_at(RateScope::Login, "alice", 62_000).unwrap();
    }

    #[test]
    fn test_user_scope_has_wider_window() {
        let limiter = RateLimiter::new();

        for _ in 0..30 {
            limiter.check_at(RateScope::User, "u_1", 1_000).unwrap();
        }
        assert!(limiter.check_at(RateScope::User, "u_1", 1_000).is_err());
    }

    #[test]
    fn test_clear_resets_everything() {
        let limiter = RateLimiter::new();

        for _ in 0..6 {
            let _ = limiter.check_at(RateScope::Address, "10.0.0.1", 1_000);
        }
        limiter.clear();

        limiter.check_at(RateScope::Address, "10.0.0.1", 1_000).unwrap();
    }
}
