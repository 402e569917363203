//! Metrics definitions for the otpgate service.
//!
//! This module defines all metrics keys used by the service and provides a helper
//! [`describe_metrics`] to set metadata for each metric using the `metrics` crate.

/// Metrics key for the number of currently open (unexpired, unverified) sessions.
pub const METRICS_ID_SESSIONS_OPEN: &str = "otpgate.sessions.open";
/// Metrics key for sessions that reached `VERIFIED`.
pub const METRICS_ID_SESSIONS_VERIFIED: &str = "otpgate.sessions.verified";
/// Metrics key for sessions evicted by the in-memory store's TTL sweeper.
pub const METRICS_ID_SESSIONS_EXPIRED: &str = "otpgate.sessions.expired";
/// Metrics key for send attempts, labeled by `transport` and `outcome`.
pub const METRICS_ID_SEND_ATTEMPTS: &str = "otpgate.send.attempts";
/// Metrics key for check attempts, labeled by `outcome`.
pub const METRICS_ID_CHECK_ATTEMPTS: &str = "otpgate.check.attempts";
/// Metrics key for rate-limit denials, labeled by `limiter`.
pub const METRICS_ID_RATE_LIMIT_DENIALS: &str = "otpgate.rate_limit.denials";
/// Metrics key for CAS conflicts observed while updating a session.
pub const METRICS_ID_CAS_CONFLICTS: &str = "otpgate.store.cas_conflicts";
/// Metrics key for completion records dropped because the channel was full.
pub const METRICS_ID_COMPLETION_RECORDS_DROPPED: &str = "otpgate.completion_records.dropped";
/// Metrics key for the duration of a single `sendCode` call.
pub const METRICS_ID_SEND_DURATION: &str = "otpgate.send.duration";
/// Metrics key for the duration of a single `checkCode` call.
pub const METRICS_ID_CHECK_DURATION: &str = "otpgate.check.duration";

/// Describe all metrics used by the service.
///
/// Calls the `describe_*` functions from the `metrics` crate to set metadata on each metric;
/// has no effect on which recorder (if any) is installed by the embedding binary.
pub fn describe_metrics() {
    metrics::describe_gauge!(
        METRICS_ID_SESSIONS_OPEN,
        metrics::Unit::Count,
        "Number of currently open sessions tracked by the store"
    );

    metrics::describe_counter!(
        METRICS_ID_SESSIONS_VERIFIED,
        metrics::Unit::Count,
        "Number of sessions that reached the verified state"
    );

    metrics::describe_counter!(
        METRICS_ID_SESSIONS_EXPIRED,
        metrics::Unit::Count,
        "Number of sessions evicted due to TTL expiry"
    );

    metrics::describe_counter!(
        METRICS_ID_SEND_ATTEMPTS,
        metrics::Unit::Count,
        "Number of sendCode attempts, labeled by transport and outcome"
    );

    metrics::describe_counter!(
        METRICS_ID_CHECK_ATTEMPTS,
        metrics::Unit::Count,
        "Number of checkCode attempts, labeled by outcome"
    );

    metrics::describe_counter!(
        METRICS_ID_RATE_LIMIT_DENIALS,
        metrics::Unit::Count,
        "Number of rate-limit denials, labeled by limiter name"
    );

    metrics::describe_counter!(
        METRICS_ID_CAS_CONFLICTS,
        metrics::Unit::Count,
        "Number of compare-and-swap conflicts observed while updating a session"
    );

    metrics::describe_counter!(
        METRICS_ID_COMPLETION_RECORDS_DROPPED,
        metrics::Unit::Count,
        "Number of completion records dropped because the channel was full"
    );

    metrics::describe_histogram!(
        METRICS_ID_SEND_DURATION,
        metrics::Unit::Milliseconds,
        "Duration of a sendCode call"
    );

    metrics::describe_histogram!(
        METRICS_ID_CHECK_DURATION,
        metrics::Unit::Milliseconds,
        "Duration of a checkCode call"
    );
}
