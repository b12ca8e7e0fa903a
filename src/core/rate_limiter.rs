//! Fixed-window quota enforcement against a shared counter store.
//!
//! Each check performs exactly one atomic round trip
//! ([`CounterStore::incr_with_expiry`]) against the key
//! `prefix + identifier + ":" + window_start`, so concurrent requests for the same
//! identifier never lose updates and no key is left without a TTL. Window starts
//! are aligned to multiples of the window length since the Unix epoch (minute
//! boundaries for the default 60 second window).
//!
//! The limiter fails open: any store failure yields
//! [`RateLimitOutcome::Unenforced`] instead of an error, so a quota outage can never
//! turn into a gateway outage. Fixed windows admit up to `2 * limit` requests
//! around a window boundary; that is accepted behavior.
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::{config::RateLimitSettings, core::identifier::Identifier, ports::CounterStore};

/// Reason attached to denials.
pub const RATE_LIMIT_EXCEEDED: &str = "Rate limit exceeded";

/// Source of the current time; swapped out in tests.
pub type Clock = fn() -> DateTime<Utc>;

/// Result of a single quota check. Produced fresh per check, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitOutcome {
    Allowed {
        remaining: u64,
        reset_at: DateTime<Utc>,
    },
    Denied {
        reset_at: DateTime<Utc>,
        reason: String,
    },
    /// The quota could not be enforced (store down, or limiting disabled).
    Unenforced { reason: String },
}

impl RateLimitOutcome {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, RateLimitOutcome::Denied { .. })
    }

    /// Requests left in the window; `-1` when the quota is not being enforced.
    pub fn remaining(&self) -> i64 {
        match self {
            RateLimitOutcome::Allowed { remaining, .. } => {
                i64::try_from(*remaining).unwrap_or(i64::MAX)
            }
            RateLimitOutcome::Denied { .. } => 0,
            RateLimitOutcome::Unenforced { .. } => -1,
        }
    }

    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        match self {
            RateLimitOutcome::Allowed { reset_at, .. }
            | RateLimitOutcome::Denied { reset_at, .. } => Some(*reset_at),
            RateLimitOutcome::Unenforced { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            RateLimitOutcome::Allowed { .. } => None,
            RateLimitOutcome::Denied { reason, .. } | RateLimitOutcome::Unenforced { reason } => {
                Some(reason)
            }
        }
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    key_prefix: String,
    window_secs: u64,
    enabled: bool,
    clock: Clock,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, settings: &RateLimitSettings) -> Self {
        Self {
            store,
            key_prefix: settings.key_prefix.clone(),
            window_secs: settings.window_secs.max(1),
            enabled: settings.enabled,
            clock: Utc::now,
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Window length used by [`RateLimiter::usage`] and [`RateLimiter::reset`].
    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    /// Count this request against `identifier`'s quota for the current window.
    ///
    /// Buckets are addressed by `window_secs`; [`RateLimiter::usage`] and
    /// [`RateLimiter::reset`] address the configured window, so checks made with
    /// another window are read and cleared through
    /// [`RateLimiter::usage_for_window`] and [`RateLimiter::reset_for_window`].
    pub async fn check(
        &self,
        identifier: &Identifier,
        limit: u64,
        window_secs: u64,
    ) -> RateLimitOutcome {
        if !self.enabled {
            tracing::debug!("Rate limiting disabled. Allowing request for {}", identifier);
            return RateLimitOutcome::Unenforced {
                reason: "rate limiting disabled".to_string(),
            };
        }

        let window_secs = window_secs.max(1);
        let window_start = window_start((self.clock)(), window_secs);
        let reset_at = window_start + TimeDelta::seconds(window_secs as i64);
        let key = self.bucket_key(identifier, window_start);

        match self.store.incr_with_expiry(&key, window_secs).await {
            Ok(count) => {
                let count = u64::try_from(count).unwrap_or(0);
                if count > limit {
                    tracing::warn!("Rate limit EXCEEDED for {}", identifier);
                    RateLimitOutcome::Denied {
                        reset_at,
                        reason: RATE_LIMIT_EXCEEDED.to_string(),
                    }
                } else {
                    let remaining = limit - count;
                    tracing::debug!(
                        "Rate limit check PASSED for {}: {} requests remaining",
                        identifier,
                        remaining
                    );
                    RateLimitOutcome::Allowed {
                        remaining,
                        reset_at,
                    }
                }
            }
            Err(e) => {
                tracing::error!(
                    "Error checking rate limit for {}: {}. Failing open.",
                    identifier,
                    e
                );
                RateLimitOutcome::Unenforced {
                    reason: format!("{} unavailable - failing open", self.store.name()),
                }
            }
        }
    }

    /// Requests counted in the current window; 0 if absent or the store is unavailable.
    pub async fn usage(&self, identifier: &Identifier) -> u64 {
        self.usage_for_window(identifier, self.window_secs).await
    }

    /// Like [`RateLimiter::usage`], for buckets of `window_secs` seconds.
    pub async fn usage_for_window(&self, identifier: &Identifier, window_secs: u64) -> u64 {
        let key = self.current_key(identifier, window_secs);
        match self.store.get(&key).await {
            Ok(value) => value.and_then(|v| u64::try_from(v).ok()).unwrap_or(0),
            Err(e) => {
                tracing::warn!("Cannot read rate limit usage for {}: {}", identifier, e);
                0
            }
        }
    }

    /// Delete the current window's counter only. Returns false when the store is
    /// unavailable and nothing was cleared.
    pub async fn reset(&self, identifier: &Identifier) -> bool {
        self.reset_for_window(identifier, self.window_secs).await
    }

    /// Like [`RateLimiter::reset`], for buckets of `window_secs` seconds.
    pub async fn reset_for_window(&self, identifier: &Identifier, window_secs: u64) -> bool {
        let key = self.current_key(identifier, window_secs);
        match self.store.delete(&key).await {
            Ok(()) => {
                tracing::info!("Rate limit reset for {}", identifier);
                true
            }
            Err(e) => {
                tracing::warn!(
                    "Cannot reset rate limit for {} - {} unavailable: {}",
                    identifier,
                    self.store.name(),
                    e
                );
                false
            }
        }
    }

    fn current_key(&self, identifier: &Identifier, window_secs: u64) -> String {
        let start = window_start((self.clock)(), window_secs.max(1));
        self.bucket_key(identifier, start)
    }

    fn bucket_key(&self, identifier: &Identifier, window_start: DateTime<Utc>) -> String {
        format!(
            "{}{}:{}",
            self.key_prefix,
            identifier,
            window_start.format("%Y-%m-%dT%H:%M:%S")
        )
    }
}

/// Start of the window containing `now`, aligned to multiples of `window_secs`.
pub fn window_start(now: DateTime<Utc>, window_secs: u64) -> DateTime<Utc> {
    let window = i64::try_from(window_secs.max(1)).unwrap_or(i64::MAX);
    let start = now.timestamp().div_euclid(window) * window;
    DateTime::from_timestamp(start, 0).unwrap_or(now)
}
