//! Configuration types and CLI/environment parsing for an otpgate service instance.
//!
//! Also defines [`Environment`], used to select the `dev` wiring (in-memory store, the
//! `last-digits` adapter, and all-allow rate limiters) versus `prod` wiring.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use otpgate_core::LimiterSchedule;
use secrecy::SecretString;

/// The environment the service is running in.
///
/// `dev` wires a self-contained in-memory deployment suitable for local development and
/// integration tests; `prod` requires a reachable Postgres instance and real upstream
/// adapter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    /// Production environment.
    Prod,
    /// Development environment.
    Dev,
}

impl Environment {
    /// Asserts that `self` is [`Environment::Dev`]. Panics otherwise.
    pub fn assert_is_dev(&self) {
        assert!(matches!(self, Environment::Dev), "is not dev environment")
    }

    /// Returns `true` iff `self` is [`Environment::Dev`].
    pub fn is_dev(&self) -> bool {
        matches!(self, Environment::Dev)
    }
}

/// The configuration for an otpgate service instance.
///
/// Configurable via environment variables or command-line arguments using `clap`.
#[derive(Parser, Debug, Clone)]
pub struct OrchestratorConfig {
    /// The environment of the otpgate service (either `prod` or `dev`).
    #[clap(long, env = "OTPGATE_ENVIRONMENT", default_value = "prod")]
    pub environment: Environment,

    /// TCP port the HTTP API listens on.
    #[clap(long, env = "OTPGATE_LISTEN_PORT", default_value = "8080")]
    pub listen_port: u16,

    /// The default session TTL assigned at `createSession`, before any send has occurred.
    #[clap(
        long,
        env = "OTPGATE_DEFAULT_SESSION_TTL",
        default_value = "10min",
        value_parser = humantime::parse_duration
    )]
    pub default_session_ttl: Duration,

    /// The name of the adapter used when no routing-table entry matches.
    #[clap(long, env = "OTPGATE_DEFAULT_ADAPTER", default_value = "last-digits")]
    pub default_adapter: String,

    /// Per-call budget before an adapter or store operation is treated as a timeout.
    #[clap(
        long,
        env = "OTPGATE_UPSTREAM_CALL_TIMEOUT",
        default_value = "5s",
        value_parser = humantime::parse_duration
    )]
    pub upstream_call_timeout: Duration,

    /// Connection string for the Postgres-backed session store. Required unless `environment`
    /// is `dev`.
    #[clap(long, env = "OTPGATE_DB_CONNECTION_STRING")]
    pub db_connection_string: Option<SecretString>,

    /// Max number of pooled Postgres connections.
    #[clap(long, env = "OTPGATE_DB_MAX_CONNECTIONS", default_value = "10")]
    pub db_max_connections: u32,

    /// Capacity of the bounded completion-record channel.
    #[clap(long, env = "OTPGATE_COMPLETION_CHANNEL_CAPACITY", default_value = "1024")]
    pub completion_channel_capacity: usize,
}

/// The seven named rate-limit schedules, loaded as one unit.
///
/// In `dev`, every limiter is replaced by an all-allow limiter regardless of these schedules
/// (see [`Environment::is_dev`]); these values only take effect in `prod`.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Schedule for the `session-creation` limiter, keyed by (phone number, source tag).
    pub session_creation: LimiterSchedule,
    /// Schedule for `send-sms-per-number` / `send-voice-per-number`, keyed by phone number.
    pub send_per_number: LimiterSchedule,
    /// Schedule for `send-sms-per-session` / `send-voice-per-session`, keyed by session id.
    pub send_per_session: LimiterSchedule,
    /// Schedule for `check-per-number`, keyed by phone number.
    pub check_per_number: LimiterSchedule,
    /// Schedule for `check-per-session`, keyed by session id.
    pub check_per_session: LimiterSchedule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            session_creation: LimiterSchedule::default_moderate(),
            send_per_number: LimiterSchedule::default_moderate(),
            send_per_session: LimiterSchedule::default_moderate(),
            check_per_number: LimiterSchedule {
                max_attempts: 10,
                ..LimiterSchedule::default_moderate()
            },
            check_per_session: LimiterSchedule {
                max_attempts: 10,
                ..LimiterSchedule::default_moderate()
            },
        }
    }
}
