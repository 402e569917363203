#![deny(missing_docs)]
//! Shared test utilities for services built on `otpgate-service`.
//!
//! - [`fake_clock`] — a deterministic substitute for wall-clock time in expiry tests, so a test
//!   can assert on "three minutes from now" without actually sleeping three minutes.
//! - [`scripted_adapter`] — a preconfigured [`otpgate_service::sender_adapter::mock_upstream`]
//!   behavior for scripting send/check outcomes deterministically.
//! - [`postgres`] (behind the `postgres-test-container` feature) — spins up a disposable
//!   Postgres instance via `testcontainers-modules` for exercising the Postgres session store.

pub mod fake_clock;
#[cfg(feature = "postgres-test-container")]
pub mod postgres;
pub mod scripted_adapter;

pub use fake_clock::FakeClock;
#[cfg(feature = "postgres-test-container")]
pub use postgres::postgres_testcontainer;
pub use scripted_adapter::ScriptedBehavior;
