//! Internal service components composed by the [`crate::orchestrator::VerificationOrchestrator`].
//!
//! - [`session_store`] – the durable session-record store (in-memory and Postgres).
//! - [`sender_adapter`] – the adapter contract, registry, and shipped adapters.
//! - [`rate_limiters`] – the seven named rate limiters, wired from [`crate::config::RateLimitConfig`].

pub mod rate_limiters;
pub mod sender_adapter;
pub mod session_store;
