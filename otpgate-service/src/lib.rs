#![deny(missing_docs)]
//! The otpgate phone-number verification service.
//!
//! This crate provides [`VerificationOrchestrator`](orchestrator::VerificationOrchestrator), the
//! state machine behind `createSession`/`sendVerificationCode`/`checkVerificationCode`/
//! `getSessionMetadata`, and [`OtpgateServiceBuilder`], which wires it together with a session
//! store, rate limiters, and sender adapters appropriate to the configured
//! [`Environment`](config::Environment) and exposes the result as an `axum::Router`.
//!
//! The embedding binary is responsible for installing a `metrics` recorder, initializing
//! tracing, binding a TCP listener, and serving the router with graceful shutdown — see
//! `src/main.rs`.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use eyre::Context as _;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::OrchestratorConfig;
use crate::orchestrator::{CompletionRecord, OrchestratorSettings, VerificationOrchestrator};
use crate::services::rate_limiters::RateLimiters;
use crate::services::sender_adapter::last_digits::LastDigitsAdapter;
use crate::services::sender_adapter::mock_upstream::MockUpstreamAdapter;
use crate::services::sender_adapter::AdapterRegistry;
use crate::services::session_store::in_memory::InMemorySessionStore;
use crate::services::session_store::SessionStoreService;

pub mod api;
pub mod config;
pub mod metrics;
pub mod orchestrator;
pub(crate) mod services;

pub use services::rate_limiters;
pub use services::sender_adapter;
pub use services::session_store;

/// Background task handles owned by the hosting application, joined during shutdown.
pub struct ServiceTasks {
    /// `Some` only in the `dev` environment, where the in-memory store sweeps expired sessions
    /// on a timer rather than relying on row-level expiry checks.
    pub sweeper: Option<tokio::task::JoinHandle<()>>,
}

/// Builds an [`VerificationOrchestrator`] and its `axum::Router` from an [`OrchestratorConfig`].
pub struct OtpgateServiceBuilder {
    router: Router,
    completion_rx: mpsc::Receiver<CompletionRecord>,
    tasks: ServiceTasks,
}

impl OtpgateServiceBuilder {
    /// Initializes the service: wires a session store, rate limiters, and the sender-adapter
    /// registry appropriate to `config.environment`, then builds the orchestrator and its
    /// router.
    ///
    /// `shutdown` is propagated into every in-flight HTTP call as a [`CancellationToken`] so a
    /// graceful shutdown can cut off slow upstream calls instead of waiting for them.
    pub async fn init(config: OrchestratorConfig, shutdown: CancellationToken) -> eyre::Result<Self> {
        metrics::describe_metrics();

        let limiters = if config.environment.is_dev() {
            tracing::info!("dev environment: all rate limiters allow every request");
            RateLimiters::allow_all()
        } else {
            RateLimiters::from_config(config::RateLimitConfig::default())
        };

        let (store, sweeper) = build_store(&config).await?;

        let adapters = AdapterRegistry::new(vec![
            Arc::new(LastDigitsAdapter::new(config.default_session_ttl)),
            Arc::new(MockUpstreamAdapter::always_accept(config.default_session_ttl)),
        ]);
        let routing = otpgate_core::RoutingTable::with_default(config.default_adapter.clone());

        let settings = OrchestratorSettings {
            default_session_ttl: config.default_session_ttl,
            upstream_call_timeout: config.upstream_call_timeout,
            completion_channel_capacity: config.completion_channel_capacity,
            default_adapter: config.default_adapter.clone(),
        };

        tracing::info!("init verification orchestrator..");
        let (orchestrator, completion_rx) =
            VerificationOrchestrator::new(settings, store, Arc::new(limiters), adapters, routing);

        let router = api::routes(Arc::new(orchestrator), shutdown);

        Ok(Self {
            router,
            completion_rx,
            tasks: ServiceTasks { sweeper },
        })
    }

    /// Consumes the builder, returning the `axum::Router`, the receiving half of the
    /// [`CompletionRecord`] channel (the embedding application owns draining it into whatever
    /// downstream analytics pipeline it has), and any background task handles to join at
    /// shutdown.
    pub fn build(self) -> (Router, mpsc::Receiver<CompletionRecord>, ServiceTasks) {
        (self.router, self.completion_rx, self.tasks)
    }
}

async fn build_store(
    config: &OrchestratorConfig,
) -> eyre::Result<(SessionStoreService, Option<tokio::task::JoinHandle<()>>)> {
    if config.environment.is_dev() {
        tracing::info!("dev environment: using in-memory session store");
        let store = InMemorySessionStore::new();
        let sweeper = store.spawn_sweeper(Duration::from_secs(60));
        return Ok((Arc::new(store), Some(sweeper)));
    }

    #[cfg(feature = "postgres")]
    {
        let connection_string = config.db_connection_string.as_ref().ok_or_else(|| {
            eyre::eyre!("OTPGATE_DB_CONNECTION_STRING is required outside the dev environment")
        })?;
        let store = services::session_store::postgres::PostgresSessionStore::init(
            connection_string,
            config.db_max_connections,
        )
        .await
        .context("while initializing postgres session store")?;
        Ok((Arc::new(store), None))
    }

    #[cfg(not(feature = "postgres"))]
    {
        let _ = config;
        eyre::bail!("the postgres feature must be enabled to run outside the dev environment")
    }
}
