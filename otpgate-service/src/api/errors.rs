//! Maps [`OrchestratorFault`] — failures with no in-band [`PublicError`] representation — to
//! HTTP status codes.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::orchestrator::OrchestratorFault;

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

/// Translates a generic [`OrchestratorFault`] into a response.
///
/// Callers that give `SessionNotFound` its own endpoint-specific meaning (`getSessionMetadata`
/// returns it in-band; `sendVerificationCode` treats it as a malformed request) must match on
/// it themselves before falling back to this function for the remaining variants.
pub(crate) fn fault_response(fault: OrchestratorFault) -> Response {
    match fault {
        OrchestratorFault::SessionNotFound => (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                message: "unknown or expired session".to_owned(),
            }),
        )
            .into_response(),
        OrchestratorFault::Cancelled => {
            tracing::debug!("request cancelled before completion");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    message: "request cancelled".to_owned(),
                }),
            )
                .into_response()
        }
        OrchestratorFault::Unavailable(reason) => {
            tracing::warn!(reason, "dependency unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorBody { message: reason }),
            )
                .into_response()
        }
    }
}
