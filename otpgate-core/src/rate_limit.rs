//! Leaky-bucket-style rate limiting, keyed by an arbitrary hashable key.
//!
//! A [`RateLimiter`] answers "permit now?" for a single named limiter. The service wires up
//! seven of these (see the orchestrator), one per named limiter in the specification, each
//! with its own [`LimiterSchedule`] and key type (phone number, session id, or a composite of
//! phone number + source tag).

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::time::Duration;

use otpgate_types::session::Timestamp;
use parking_lot::Mutex;

/// The outcome of consulting a [`RateLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// The attempt is permitted; it has been recorded against the key's window.
    Allowed,
    /// The attempt is denied; the caller should wait at least `retry_after` before retrying.
    Denied {
        /// How long the caller should wait before the next attempt may succeed.
        retry_after: Duration,
    },
}

impl RateLimitDecision {
    /// Returns `true` iff this decision is [`RateLimitDecision::Allowed`].
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed)
    }
}

/// The permitted-attempt schedule for one limiter.
///
/// At most `max_attempts` attempts are permitted within any trailing `window`. Once that
/// budget is exhausted, each additional attempt within the window is denied with a
/// `retry_after` that grows exponentially (`backoff_base * 2^violations`, capped at
/// `max_backoff`) the more consecutive denials the key accumulates, so a caller hammering a
/// denied key backs off rather than polling at a fixed cadence.
#[derive(Debug, Clone, Copy)]
pub struct LimiterSchedule {
    /// Maximum attempts permitted within `window`.
    pub max_attempts: u32,
    /// The trailing window attempts are counted over.
    pub window: Duration,
    /// The retry-after returned on the first denial.
    pub backoff_base: Duration,
    /// The ceiling `retry_after` can grow to under repeated denials.
    pub max_backoff: Duration,
}

impl LimiterSchedule {
    /// A permissive default: 5 attempts per minute, backing off from 10s up to 5 minutes.
    pub fn default_moderate() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::from_secs(60),
            backoff_base: Duration::from_secs(10),
            max_backoff: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Default)]
struct KeyState {
    attempts: VecDeque<Timestamp>,
    violations: u32,
}

/// A single named rate limiter over keys of type `K`.
///
/// Constructed either with a [`LimiterSchedule`] (the production behavior) or via
/// [`RateLimiter::allow_all`] (the `dev` profile, which never denies and never allocates
/// per-key state).
pub struct RateLimiter<K> {
    schedule: Option<LimiterSchedule>,
    state: Mutex<HashMap<K, KeyState>>,
}

impl<K: Eq + Hash + Clone> RateLimiter<K> {
    /// Builds a limiter enforcing `schedule`.
    pub fn new(schedule: LimiterSchedule) -> Self {
        Self {
            schedule: Some(schedule),
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Builds a limiter that permits every attempt unconditionally — the `dev` environment
    /// profile described in the specification.
    pub fn allow_all() -> Self {
        Self {
            schedule: None,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Consults the limiter for `key` at time `now`, recording the attempt if permitted.
    pub fn check(&self, key: K, now: Timestamp) -> RateLimitDecision {
        let Some(schedule) = self.schedule else {
            return RateLimitDecision::Allowed;
        };

        let mut state = self.state.lock();
        let entry = state.entry(key).or_default();

        while let Some(oldest) = entry.attempts.front() {
            if now.saturating_duration_since(*oldest) > schedule.window {
                entry.attempts.pop_front();
            } else {
                break;
            }
        }

        if entry.attempts.len() < schedule.max_attempts as usize {
            entry.attempts.push_back(now);
            entry.violations = 0;
            RateLimitDecision::Allowed
        } else {
            let retry_after = exponential_backoff(
                schedule.backoff_base,
                schedule.max_backoff,
                entry.violations,
            );
            entry.violations = entry.violations.saturating_add(1);
            RateLimitDecision::Denied { retry_after }
        }
    }
}

fn exponential_backoff(base: Duration, max: Duration, violations: u32) -> Duration {
    let factor = 1u64.checked_shl(violations.min(32)).unwrap_or(u64::MAX);
    base.saturating_mul(factor.try_into().unwrap_or(u32::MAX)).min(max)
}
