#![deny(missing_docs)]
//! Thin HTTP client for the otpgate verification service.
//!
//! Wraps the four `/api/v1` operations (`createSession`, `getSessionMetadata`,
//! `sendVerificationCode`, `checkVerificationCode`) behind typed methods. Intended for
//! integration tests and external callers that would otherwise hand-assemble `reqwest` calls
//! against [`otpgate_types::api::v1`].

use otpgate_types::api::v1::{
    CheckVerificationCodeRequest, CheckVerificationCodeResponse, CreateSessionRequest,
    CreateSessionResponse, GetSessionMetadataResponse, SendVerificationCodeRequest,
    SendVerificationCodeResponse, SessionMetadata,
};
use otpgate_types::{PublicError, SessionId, Transport};
use tracing::instrument;

/// Errors returned by [`OtpgateClient`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying HTTP request failed (connection refused, timed out, TLS error, ...).
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    /// The server reported an in-band [`PublicError`].
    #[error("server rejected the request: {0:?}")]
    Rejected(PublicError),
}

/// A thin HTTP client for a single otpgate-service instance.
///
/// Cheap to clone: internally an `Arc`-backed [`reqwest::Client`] and a base URL.
#[derive(Debug, Clone)]
pub struct OtpgateClient {
    http: reqwest::Client,
    base_url: String,
}

impl OtpgateClient {
    /// Builds a client that targets `base_url` (e.g. `http://localhost:8080`), using a
    /// freshly constructed [`reqwest::Client`] with the library defaults.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(reqwest::Client::new(), base_url)
    }

    /// Builds a client from a caller-supplied [`reqwest::Client`], e.g. to share a connection
    /// pool across several services or to configure a timeout.
    pub fn with_http_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_owned();
        Self { http, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Calls `POST /api/v1/sessions`.
    ///
    /// Returns [`Error::Rejected`] when the server rejected the phone number in-band
    /// (rate-limited or illegal).
    #[instrument(level = "debug", skip(self))]
    pub async fn create_session(
        &self,
        e164: u64,
    ) -> Result<otpgate_types::api::v1::SessionMetadata, Error> {
        let response: CreateSessionResponse = self
            .http
            .post(self.url("/api/v1/sessions"))
            .json(&CreateSessionRequest { e164 })
            .send()
            .await?
            .json()
            .await?;
        resolve(response.session_metadata, response.error)
    }

    /// Calls `GET /api/v1/sessions/{sessionId}`.
    ///
    /// Returns [`Error::Rejected`] with [`PublicError::NotFound`] for an unknown or expired
    /// session id.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_session_metadata(
        &self,
        session_id: SessionId,
    ) -> Result<otpgate_types::api::v1::SessionMetadata, Error> {
        let response: GetSessionMetadataResponse = self
            .http
            .get(self.url(&format!("/api/v1/sessions/{session_id}")))
            .send()
            .await?
            .json()
            .await?;
        resolve(response.session_metadata, response.error)
    }

    /// Calls `POST /api/v1/sessions/{sessionId}/send`.
    ///
    /// `accept_language` and `client_type` mirror the optional wire fields; pass `None` for
    /// either when the caller has no preference to express.
    #[instrument(level = "debug", skip(self))]
    pub async fn send_verification_code(
        &self,
        session_id: SessionId,
        transport: Transport,
        accept_language: Option<String>,
        client_type: Option<String>,
    ) -> Result<SendVerificationCodeResponse, Error> {
        let response: SendVerificationCodeResponse = self
            .http
            .post(self.url(&format!("/api/v1/sessions/{session_id}/send")))
            .json(&SendVerificationCodeRequest {
                transport,
                accept_language,
                client_type,
            })
            .send()
            .await?
            .json()
            .await?;
        Ok(response)
    }

    /// Calls `POST /api/v1/sessions/{sessionId}/check`.
    ///
    /// A wrong code or an expired/unknown session both come back as `verified: false`; the
    /// service never reports an in-band error for this operation.
    #[instrument(level = "debug", skip(self))]
    pub async fn check_verification_code(
        &self,
        session_id: SessionId,
        verification_code: impl Into<String>,
    ) -> Result<CheckVerificationCodeResponse, Error> {
        let response: CheckVerificationCodeResponse = self
            .http
            .post(self.url(&format!("/api/v1/sessions/{session_id}/check")))
            .json(&CheckVerificationCodeRequest {
                verification_code: verification_code.into(),
            })
            .send()
            .await?
            .json()
            .await?;
        Ok(response)
    }
}

fn resolve<T>(value: Option<T>, error: Option<PublicError>) -> Result<T, Error> {
    match (value, error) {
        (Some(value), _) => Ok(value),
        (None, Some(error)) => Err(Error::Rejected(error)),
        (None, None) => unreachable!("server responses always carry session_metadata or error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path_without_double_slash() {
        let client = OtpgateClient::new("http://localhost:8080/");
        assert_eq!(
            client.url("/api/v1/sessions"),
            "http://localhost:8080/api/v1/sessions"
        );
    }
}
