//! Liveness/readiness endpoint.
//!
//! - `/healthz` – reports whether the session store is reachable and the configured default
//!   adapter is registered.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;

use super::AppState;

/// Builds a router containing the health endpoint.
pub(crate) fn routes(state: AppState) -> Router {
    Router::new().route("/healthz", get(move || healthz(State(state))))
}

/// Returns `200 OK` with `"healthy"` if the store answers and the default adapter is
/// registered, `503 Service Unavailable` with `"unhealthy"` otherwise.
async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    if state.orchestrator.is_healthy().await {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    }
}
