//! Pure session state-machine transitions.
//!
//! Every function here takes an existing [`SessionRecord`] (by value or reference) and returns
//! either a new record with `version` incremented by exactly one, or a [`PublicError`] without
//! touching the record at all. None of these functions perform I/O or consult a clock beyond
//! the `now` passed in by the caller — the orchestrator supplies `now` and is responsible for
//! actually committing the result via the store's compare-and-swap `update`.

use otpgate_types::session::{CheckAttempt, CheckOutcome, SendAttempt, SendOutcome, Timestamp};
use otpgate_types::{PublicError, SessionRecord, Transport};

/// Checks whether a send may proceed against `session`, independent of rate limits or adapter
/// availability (invariant 1: once verified, no further sends succeed).
pub fn validate_send(session: &SessionRecord) -> Result<(), PublicError> {
    if session.is_verified() {
        Err(PublicError::SessionAlreadyVerified)
    } else {
        Ok(())
    }
}

/// Applies a successful send: commits `sender_name` (if unset — invariant 3), overwrites
/// `sender_data`, extends `expires_at` to `now + session_ttl`, and appends a successful
/// `send_attempts` entry.
///
/// # Panics
/// Panics if `session.sender_name` is set to something other than `adapter_name` — callers
/// must resolve the adapter via the selection strategy first, which already enforces this.
pub fn apply_send_success(
    session: &SessionRecord,
    transport: Transport,
    adapter_name: &str,
    payload: Vec<u8>,
    session_ttl: std::time::Duration,
    now: Timestamp,
) -> SessionRecord {
    if let Some(existing) = &session.sender_name {
        assert_eq!(
            existing, adapter_name,
            "selection strategy must not route to a different adapter than a session already committed to"
        );
    }

    let mut next = session.clone();
    next.sender_name = Some(adapter_name.to_owned());
    next.sender_data = Some(payload);
    next.expires_at = now.plus(session_ttl);
    next.send_attempts.push(SendAttempt {
        transport,
        timestamp: now,
        adapter_name: adapter_name.to_owned(),
        outcome: SendOutcome::Success,
    });
    next.version += 1;
    next
}

/// Records a failed send attempt without mutating `sender_name`/`sender_data`/`expires_at`
/// (a transient send failure must not extend the session's lifetime).
pub fn apply_send_failure(
    session: &SessionRecord,
    transport: Transport,
    adapter_name: &str,
    outcome: SendOutcome,
    now: Timestamp,
) -> SessionRecord {
    let mut next = session.clone();
    next.send_attempts.push(SendAttempt {
        transport,
        timestamp: now,
        adapter_name: adapter_name.to_owned(),
        outcome,
    });
    next.version += 1;
    next
}

/// Checks whether a check attempt may proceed against `session` (invariant 2: a session with
/// no recorded send can never be checked).
pub fn validate_check(session: &SessionRecord) -> Result<(), PublicError> {
    if session.sender_data.is_none() {
        Err(PublicError::NoCodeSent)
    } else {
        Ok(())
    }
}

/// If `submitted_code` already verified this session, returns `Some(true)` without requiring a
/// state transition or upstream call — idempotent re-verification.
pub fn already_verified_by(session: &SessionRecord, submitted_code: &str) -> bool {
    session.verified_code.as_deref() == Some(submitted_code)
}

/// Applies a successful check: sets `verified_code` (invariant: exactly once) and appends a
/// successful `check_attempts` entry.
pub fn apply_check_success(
    session: &SessionRecord,
    submitted_code: &str,
    now: Timestamp,
) -> SessionRecord {
    let mut next = session.clone();
    next.verified_code = Some(submitted_code.to_owned());
    next.check_attempts.push(CheckAttempt {
        timestamp: now,
        outcome: CheckOutcome::Success,
    });
    next.version += 1;
    next
}

/// Records a failed check attempt; nothing else about the session changes.
pub fn apply_check_failure(session: &SessionRecord, now: Timestamp) -> SessionRecord {
    let mut next = session.clone();
    next.check_attempts.push(CheckAttempt {
        timestamp: now,
        outcome: CheckOutcome::Failed,
    });
    next.version += 1;
    next
}
