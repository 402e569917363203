//! The session record: the central entity of the verification service.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::{PhoneNumber, SessionId, Transport};

/// An absolute wall-clock instant, serialized as milliseconds since the Unix epoch.
///
/// A dedicated wrapper (rather than [`SystemTime`] directly) keeps the millisecond-precision
/// wire/storage representation in one place and gives tests a cheap way to construct fixed
/// instants without going through a real clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// Wraps the current wall-clock time.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Wraps a [`SystemTime`], saturating to the Unix epoch if it precedes it.
    pub fn from_system_time(time: SystemTime) -> Self {
        Self(time.duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default())
    }

    /// Constructs a [`Timestamp`] `millis` milliseconds after the Unix epoch.
    pub fn from_millis_since_epoch(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Returns milliseconds since the Unix epoch.
    pub fn as_millis_since_epoch(&self) -> u64 {
        self.0.as_millis() as u64
    }

    /// Returns a new [`Timestamp`] `duration` later.
    pub fn plus(&self, duration: Duration) -> Self {
        Self(self.0 + duration)
    }

    /// Returns `true` if `self` is strictly before `other`.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self < other
    }

    /// Returns how long ago `earlier` was, relative to `self`; zero if `earlier` is not
    /// actually before `self`.
    pub fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.as_millis_since_epoch())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Self::from_millis_since_epoch(millis))
    }
}

/// The terminal classification of a single `sendCode` attempt, recorded into
/// [`SessionRecord::send_attempts`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendOutcome {
    /// The adapter accepted and dispatched the code.
    Success,
    /// The adapter rejected the request (`SENDER_ILLEGAL_ARGUMENT` or `SENDER_REJECTED`);
    /// carries the mapped error's stable tag for audit/debugging purposes.
    Rejected {
        /// The stable tag of the mapped [`crate::PublicError`] (e.g. `"SENDER_REJECTED"`).
        reason: String,
    },
    /// The adapter, or a limiter, failed transiently; the caller may retry.
    Transient {
        /// The stable tag of the mapped [`crate::PublicError`] (e.g. `"SENDER_UNAVAILABLE"`).
        reason: String,
    },
}

/// One append-only entry in [`SessionRecord::send_attempts`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendAttempt {
    /// The transport requested for this attempt.
    pub transport: Transport,
    /// When the attempt was made.
    pub timestamp: Timestamp,
    /// The adapter that handled (or attempted to handle) the send.
    pub adapter_name: String,
    /// How the attempt concluded.
    pub outcome: SendOutcome,
}

/// The terminal classification of a single `checkCode` attempt, recorded into
/// [`SessionRecord::check_attempts`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The submitted code matched.
    Success,
    /// The submitted code did not match.
    Failed,
}

/// One append-only entry in [`SessionRecord::check_attempts`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckAttempt {
    /// When the attempt was made.
    pub timestamp: Timestamp,
    /// How the attempt concluded.
    pub outcome: CheckOutcome,
}

/// The central entity of the verification service: a per-phone-number record tracking one
/// in-flight (or completed) verification attempt.
///
/// See the crate-level invariants in the specification this type implements: `verified_code`
/// is set at most once, `sender_name` never changes once set, and `version` increases by
/// exactly one on every successful write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Stable identifier, assigned at creation.
    pub session_id: SessionId,
    /// The phone number this session verifies. Immutable after creation.
    pub phone_number: PhoneNumber,
    /// When the session was created.
    pub created_at: Timestamp,
    /// Absolute expiry. May only ever extend, never shrink.
    pub expires_at: Timestamp,
    /// The adapter that most recently handled a send for this session, if any.
    pub sender_name: Option<String>,
    /// Opaque payload produced by `sender_name`'s adapter; interpreted only by it.
    pub sender_data: Option<Vec<u8>>,
    /// The literal code that verified this session, set exactly once.
    pub verified_code: Option<String>,
    /// Append-only log of send attempts.
    pub send_attempts: Vec<SendAttempt>,
    /// Append-only log of check attempts.
    pub check_attempts: Vec<CheckAttempt>,
    /// Monotonic counter used for compare-and-swap updates.
    pub version: u64,
}

impl SessionRecord {
    /// Builds a freshly created session record for `phone_number`, expiring after `ttl`.
    pub fn new(session_id: SessionId, phone_number: PhoneNumber, ttl: Duration) -> Self {
        let created_at = Timestamp::now();
        Self {
            session_id,
            phone_number,
            created_at,
            expires_at: created_at.plus(ttl),
            sender_name: None,
            sender_data: None,
            verified_code: None,
            send_attempts: Vec::new(),
            check_attempts: Vec::new(),
            version: 0,
        }
    }

    /// Returns `true` iff `now` is past this session's expiry, i.e. the session must be
    /// treated as absent from the store.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_before(&now)
    }

    /// Returns `true` iff this session has already been verified.
    pub fn is_verified(&self) -> bool {
        self.verified_code.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SessionRecord {
        SessionRecord::new(
            SessionId::generate(),
            PhoneNumber::from_e164_u64(15555550100).unwrap(),
            Duration::from_secs(300),
        )
    }

    #[test]
    fn new_session_is_not_verified_and_has_version_zero() {
        let session = sample();
        assert!(!session.is_verified());
        assert_eq!(session.version, 0);
        assert!(session.sender_name.is_none());
    }

    #[test]
    fn expiry_extends_but_record_does_not_enforce_monotonicity_itself() {
        let session = sample();
        let later = session.expires_at.plus(Duration::from_secs(60));
        assert!(session.expires_at.is_before(&later));
    }

    #[test]
    fn is_expired_at_compares_against_expires_at() {
        let session = sample();
        assert!(!session.is_expired_at(session.created_at));
        assert!(session.is_expired_at(session.expires_at.plus(Duration::from_secs(1))));
    }

    #[test]
    fn timestamp_roundtrips_through_millis() {
        let ts = Timestamp::now();
        let roundtripped = Timestamp::from_millis_since_epoch(ts.as_millis_since_epoch());
        assert_eq!(ts, roundtripped);
    }
}
