#![deny(missing_docs)]
//! Pure, allocation-light algorithms shared by the otpgate verification service.
//!
//! This crate holds the parts of the system that can be expressed as plain functions over
//! plain data: the rate-limit decision math (see [`rate_limit`]), the session state-machine
//! transitions (see [`state_machine`]), the adapter selection strategy (see [`selection`]),
//! and the bounded-retry helper used around CAS conflicts and transient faults (see [`retry`]).
//!
//! None of these types perform I/O; the async orchestration that calls into them lives in
//! `otpgate-service`.

pub mod rate_limit;
pub mod retry;
pub mod selection;
pub mod state_machine;

pub use rate_limit::{LimiterSchedule, RateLimiter, RateLimitDecision};
pub use retry::{retry_bounded, RetryPolicy};
pub use selection::{select_adapter, RoutingTable, SelectionError};
pub use state_machine::{
    already_verified_by, apply_check_failure, apply_check_success, apply_send_failure,
    apply_send_success, validate_check, validate_send,
};
