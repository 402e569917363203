//! The seven named rate limiters consulted by the orchestrator, wired from
//! [`crate::config::RateLimitConfig`].

use otpgate_core::RateLimiter;
use otpgate_types::{PhoneNumber, SessionId};

/// A composite key for limiters keyed by (phone number, source tag), e.g. `session-creation`.
///
/// Hashed as a tuple rather than a concatenated string so that distinct (number, tag) pairs can
/// never collide into the same bucket.
pub type NumberSourceKey = (u64, &'static str);

/// The seven named limiters, grouped as one unit the orchestrator holds.
pub struct RateLimiters {
    /// Keyed by (phone number, source tag).
    pub session_creation: RateLimiter<NumberSourceKey>,
    /// Keyed by phone number.
    pub send_sms_per_number: RateLimiter<u64>,
    /// Keyed by phone number.
    pub send_voice_per_number: RateLimiter<u64>,
    /// Keyed by phone number.
    pub check_per_number: RateLimiter<u64>,
    /// Keyed by session id.
    pub send_sms_per_session: RateLimiter<SessionId>,
    /// Keyed by session id.
    pub send_voice_per_session: RateLimiter<SessionId>,
    /// Keyed by session id.
    pub check_per_session: RateLimiter<SessionId>,
}

impl RateLimiters {
    /// Builds all seven limiters from `config`, enforcing their schedules.
    pub fn from_config(config: crate::config::RateLimitConfig) -> Self {
        Self {
            session_creation: RateLimiter::new(config.session_creation),
            send_sms_per_number: RateLimiter::new(config.send_per_number),
            send_voice_per_number: RateLimiter::new(config.send_per_number),
            check_per_number: RateLimiter::new(config.check_per_number),
            send_sms_per_session: RateLimiter::new(config.send_per_session),
            send_voice_per_session: RateLimiter::new(config.send_per_session),
            check_per_session: RateLimiter::new(config.check_per_session),
        }
    }

    /// Builds all seven limiters in the `dev`, all-allow profile.
    pub fn allow_all() -> Self {
        Self {
            session_creation: RateLimiter::allow_all(),
            send_sms_per_number: RateLimiter::allow_all(),
            send_voice_per_number: RateLimiter::allow_all(),
            check_per_number: RateLimiter::allow_all(),
            send_sms_per_session: RateLimiter::allow_all(),
            send_voice_per_session: RateLimiter::allow_all(),
            check_per_session: RateLimiter::allow_all(),
        }
    }

    /// Returns the key for the `session-creation` limiter for a `createSession` attempt with
    /// no additional source distinction (the HTTP framing does not currently supply one).
    pub fn session_creation_key(phone_number: &PhoneNumber) -> NumberSourceKey {
        (phone_number.to_e164_u64(), "http")
    }
}
