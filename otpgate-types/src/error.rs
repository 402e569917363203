//! The public error taxonomy returned by the verification orchestrator.
//!
//! Every in-band failure the orchestrator can produce maps to exactly one [`PublicError`]
//! variant. Transport-level concerns (malformed requests, cancellation) are not represented
//! here — those surface as plain HTTP status codes at the wire layer.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A public, stable error kind returned at the RPC edge.
///
/// Each variant carries exactly the data the distilled spec's wire contract requires and
/// nothing more; `senderData`/internal adapter errors never leak through this type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicError {
    /// A rate limiter denied the request. The caller may retry after `retry_after`.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Duration the caller should wait before retrying.
        #[serde(with = "duration_seconds")]
        retry_after: Duration,
    },
    /// The supplied phone number does not parse as a plausible E.164 number.
    #[error("illegal phone number")]
    IllegalPhoneNumber,
    /// The session has already been verified; no further sends are permitted.
    #[error("session already verified")]
    SessionAlreadyVerified,
    /// A check was attempted before any code was sent for this session.
    #[error("no code sent for this session")]
    NoCodeSent,
    /// The session id does not exist, or pointed to an expired session.
    #[error("session not found")]
    NotFound,
    /// The upstream provider rejected the request as malformed.
    #[error("sender rejected request as malformed")]
    SenderIllegalArgument,
    /// The upstream provider refused the request for policy or destination reasons.
    #[error("sender rejected request")]
    SenderRejected,
    /// The upstream provider (or the selection strategy) is unavailable; retryable.
    #[error("sender unavailable")]
    SenderUnavailable,
}

impl PublicError {
    /// Whether the caller may retry this exact request (possibly after `retry_after_seconds`).
    pub fn may_retry(&self) -> bool {
        matches!(
            self,
            PublicError::RateLimited { .. } | PublicError::SenderUnavailable
        )
    }

    /// The `retry-after` duration, if this error carries one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            PublicError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

mod duration_seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}
