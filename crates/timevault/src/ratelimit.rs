//! Password-attempt rate limiting.
//!
//! Bounds online and offline guessing against password conditions. Keyed by
//! (capsule, opener) with exponential backoff on failures; holds its own
//! lock, distinct from any capsule's lifecycle lock.

use std::collections::HashMap;
use std::sync::Mutex;

use timevault_core::{CapsuleId, IdentityId};

/// Default first-failure backoff (1 second).
const DEFAULT_BASE_BACKOFF_MS: i64 = 1_000;

/// Default backoff ceiling (1 hour).
const DEFAULT_MAX_BACKOFF_MS: i64 = 3_600_000;

struct AttemptState {
    failures: u32,
    next_allowed_at: i64,
}

/// Shared attempt counter with exponential backoff.
pub struct RateLimiter {
    attempts: Mutex<HashMap<(CapsuleId, IdentityId), AttemptState>>,
    base_backoff_ms: i64,
    max_backoff_ms: i64,
}

impl RateLimiter {
    /// A limiter with default backoff (1s doubling, capped at 1h).
    pub fn new() -> Self {
        Self::with_backoff(DEFAULT_BASE_BACKOFF_MS, DEFAULT_MAX_BACKOFF_MS)
    }

    /// A limiter with custom backoff parameters.
    pub fn with_backoff(base_backoff_ms: i64, max_backoff_ms: i64) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            base_backoff_ms,
            max_backoff_ms,
        }
    }

    /// Whether an attempt by (capsule, opener) is currently throttled.
    ///
    /// Returns the instant the next attempt becomes allowed, when throttled.
    pub fn check(&self, capsule: CapsuleId, opener: &IdentityId, now: i64) -> Option<i64> {
        let attempts = self.attempts.lock().expect("rate limiter lock poisoned");
        attempts
            .get(&(capsule, opener.clone()))
            .filter(|state| now < state.next_allowed_at)
            .map(|state| state.next_allowed_at)
    }

    /// Record a failed password attempt: doubles the backoff.
    pub fn record_failure(&self, capsule: CapsuleId, opener: &IdentityId, now: i64) {
        let mut attempts = self.attempts.lock().expect("rate limiter lock poisoned");
        let state = attempts
            .entry((capsule, opener.clone()))
            .or_insert(AttemptState {
                failures: 0,
                next_allowed_at: now,
            });

        state.failures = state.failures.saturating_add(1);
        let exponent = state.failures.saturating_sub(1).min(31);
        let backoff = self
            .base_backoff_ms
            .saturating_mul(1_i64 << exponent)
            .min(self.max_backoff_ms);
        state.next_allowed_at = now.saturating_add(backoff);
    }

    /// Record a successful attempt: clears the counter.
    pub fn record_success(&self, capsule: CapsuleId, opener: &IdentityId) {
        let mut attempts = self.attempts.lock().expect("rate limiter lock poisoned");
        attempts.remove(&(capsule, opener.clone()));
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
