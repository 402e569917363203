//! HTTP/JSON surface of the otpgate service.
//!
//! This module defines every route the service exposes and organizes them into submodules:
//!
//! - [`errors`] – maps orchestrator faults that have no in-band representation to HTTP
//!   responses.
//! - [`health`] – the `/healthz` liveness/readiness route.
//! - [`v1`] – the four verification operations, versioned under `/api/v1`.

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, header};
use tokio_util::sync::CancellationToken;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::orchestrator::VerificationOrchestrator;

pub(crate) mod errors;
pub(crate) mod health;
pub(crate) mod v1;

/// Shared state every handler closes over: the orchestrator and the service-wide shutdown
/// token propagated into each in-flight call so a graceful shutdown can cut off slow upstream
/// calls rather than wait for them.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) orchestrator: Arc<VerificationOrchestrator>,
    pub(crate) shutdown: CancellationToken,
}

/// Builds the full router: `/healthz` plus the versioned API, with request tracing and a
/// `Cache-Control: no-cache` header on every response.
pub fn routes(orchestrator: Arc<VerificationOrchestrator>, shutdown: CancellationToken) -> Router {
    let state = AppState {
        orchestrator,
        shutdown,
    };
    Router::new()
        .merge(health::routes(state.clone()))
        .nest("/api/v1", v1::routes(state))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(TraceLayer::new_for_http())
}
