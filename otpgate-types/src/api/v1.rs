//! # v1 API types
//!
//! Request/response payloads for the four unary verification operations, exchanged between
//! clients and the server as JSON over HTTP.

use serde::{Deserialize, Serialize};

use crate::{ClientType, LanguageRanges, PhoneNumber, PublicError, SessionId, Transport};

/// Metadata about a session, returned by every operation that has a session to report on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// The session's stable identifier.
    pub session_id: SessionId,
    /// The phone number this session verifies.
    pub e164: PhoneNumber,
    /// Whether the session has already been verified.
    pub verified: bool,
}

/// Request body for `POST /api/v1/sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    /// The phone number to verify, as a wire-format E.164 integer.
    pub e164: u64,
}

/// Response body for `POST /api/v1/sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    /// Present iff the call succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_metadata: Option<SessionMetadata>,
    /// Present iff the call failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PublicError>,
}

/// Response body for `GET /api/v1/sessions/{sessionId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSessionMetadataResponse {
    /// Present iff the session exists and has not expired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_metadata: Option<SessionMetadata>,
    /// Present iff the call failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PublicError>,
}

/// Request body for `POST /api/v1/sessions/{sessionId}/send`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendVerificationCodeRequest {
    /// The delivery channel to use.
    pub transport: Transport,
    /// Optional caller language preference (`Accept-Language`-style).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_language: Option<String>,
    /// Optional caller-supplied client type hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_type: Option<String>,
}

impl SendVerificationCodeRequest {
    /// Parses the optional `accept_language` field into [`LanguageRanges`].
    pub fn language_ranges(&self) -> LanguageRanges {
        self.accept_language
            .as_deref()
            .map(LanguageRanges::parse)
            .unwrap_or_default()
    }

    /// Resolves the optional `client_type` field into a [`ClientType`].
    pub fn client_type(&self) -> ClientType {
        self.client_type
            .clone()
            .map(ClientType::new)
            .unwrap_or_default()
    }
}

/// Response body for `POST /api/v1/sessions/{sessionId}/send`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendVerificationCodeResponse {
    /// Echoes the session id from the request.
    pub session_id: SessionId,
    /// Present when the session could be loaded, regardless of success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_metadata: Option<SessionMetadata>,
    /// Present iff the call failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PublicError>,
}

/// Request body for `POST /api/v1/sessions/{sessionId}/check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckVerificationCodeRequest {
    /// The code the caller claims to have received.
    pub verification_code: String,
}

/// Response body for `POST /api/v1/sessions/{sessionId}/check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckVerificationCodeResponse {
    /// Whether `verification_code` matched.
    pub verified: bool,
    /// Present when the session could be loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_metadata: Option<SessionMetadata>,
    /// Present iff the call failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PublicError>,
}
