//! The four verification operations, exposed as JSON over HTTP:
//!
//! - `POST /api/v1/sessions` – `createSession`
//! - `GET /api/v1/sessions/{sessionId}` – `getSessionMetadata`
//! - `POST /api/v1/sessions/{sessionId}/send` – `sendVerificationCode`
//! - `POST /api/v1/sessions/{sessionId}/check` – `checkVerificationCode`

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Router, http::StatusCode};
use otpgate_types::api::v1::{
    CheckVerificationCodeRequest, CreateSessionRequest, CreateSessionResponse,
    GetSessionMetadataResponse, SendVerificationCodeRequest,
};
use otpgate_types::{PublicError, SessionId};
use tracing::instrument;

use super::AppState;
use super::errors::fault_response;
use crate::orchestrator::{CreateSessionOutcome, OrchestratorFault};

/// Builds the versioned router. Nested under `/api/v1` by [`crate::api::routes`].
pub(crate) fn routes(state: AppState) -> Router {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{sessionId}", get(get_session_metadata))
        .route("/sessions/{sessionId}/send", post(send_verification_code))
        .route("/sessions/{sessionId}/check", post(check_verification_code))
        .with_state(state)
}

/// `POST /api/v1/sessions`.
///
/// Returns `200 OK` with either a fresh [`otpgate_types::api::v1::SessionMetadata`] or an
/// in-band [`PublicError`] (`RATE_LIMITED` or `ILLEGAL_PHONE_NUMBER`). A store outage or
/// cancellation has no in-band representation here and surfaces as a non-200 status instead.
#[instrument(level = "debug", skip(state, request))]
async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Response {
    match state
        .orchestrator
        .create_session(request.e164, &state.shutdown)
        .await
    {
        Ok(CreateSessionOutcome::Created(session_metadata)) => Json(CreateSessionResponse {
            session_metadata: Some(session_metadata),
            error: None,
        })
        .into_response(),
        Ok(CreateSessionOutcome::Rejected(error)) => Json(CreateSessionResponse {
            session_metadata: None,
            error: Some(error),
        })
        .into_response(),
        Err(fault) => fault_response(fault),
    }
}

/// `GET /api/v1/sessions/{sessionId}`.
///
/// An unknown or expired session is reported in-band as [`PublicError::NotFound`] with
/// `200 OK`, not as an HTTP 404 — this is a read, not a routing decision.
#[instrument(level = "debug", skip(state))]
async fn get_session_metadata(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> Response {
    match state.orchestrator.get_session(session_id).await {
        Ok(session_metadata) => Json(GetSessionMetadataResponse {
            session_metadata: Some(session_metadata),
            error: None,
        })
        .into_response(),
        Err(OrchestratorFault::SessionNotFound) => Json(GetSessionMetadataResponse {
            session_metadata: None,
            error: Some(PublicError::NotFound),
        })
        .into_response(),
        Err(fault) => fault_response(fault),
    }
}

/// `POST /api/v1/sessions/{sessionId}/send`.
///
/// An unknown or expired session id is treated as a malformed request (`400 Bad Request`):
/// callers only ever learn a session id from a prior `createSession` response.
#[instrument(level = "debug", skip(state, request))]
async fn send_verification_code(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Json(request): Json<SendVerificationCodeRequest>,
) -> Response {
    let language_ranges = request.language_ranges();
    let client_type = request.client_type();
    match state
        .orchestrator
        .send_code(
            session_id,
            request.transport,
            language_ranges,
            client_type,
            &state.shutdown,
        )
        .await
    {
        Ok(response) => Json(response).into_response(),
        Err(OrchestratorFault::SessionNotFound) => StatusCode::BAD_REQUEST.into_response(),
        Err(fault) => fault_response(fault),
    }
}

/// `POST /api/v1/sessions/{sessionId}/check`.
///
/// An empty `verificationCode` is a malformed request (`400 Bad Request`), not an in-band
/// failed check. Otherwise this never fails infrastructurally in a way a caller can observe: an
/// unknown session, an expired session, or an upstream timeout all settle as `verified: false`
/// with no `error`.
#[instrument(level = "debug", skip(state, request))]
async fn check_verification_code(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Json(request): Json<CheckVerificationCodeRequest>,
) -> Response {
    if request.verification_code.is_empty() {
        return StatusCode::BAD_REQUEST.into_response();
    }
    let response = state
        .orchestrator
        .check_code(session_id, &request.verification_code, &state.shutdown)
        .await;
    Json(response).into_response()
}
