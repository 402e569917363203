use otpgate_types::api::v1::{
    CheckVerificationCodeRequest, CheckVerificationCodeResponse, CreateSessionRequest,
    CreateSessionResponse, GetSessionMetadataResponse, SendVerificationCodeRequest,
    SendVerificationCodeResponse,
};
use axum::http::StatusCode;
use otpgate_types::{PublicError, SessionId, Transport};
use uuid::Uuid;

mod setup;

const US_NUMBER: u64 = 15555550100;

#[tokio::test]
async fn happy_path_verifies_and_stays_verified_on_replay() {
    let server = setup::start_dev_server().await;

    let created: CreateSessionResponse = server
        .post("/api/v1/sessions")
        .json(&CreateSessionRequest { e164: US_NUMBER })
        .await
        .json();
    let session_id = created.session_metadata.expect("session created").session_id;

    let sent: SendVerificationCodeResponse = server
        .post(&format!("/api/v1/sessions/{session_id}/send"))
        .json(&SendVerificationCodeRequest {
            transport: Transport::Sms,
            accept_language: None,
            client_type: None,
        })
        .await
        .json();
    assert!(sent.error.is_none());

    let checked: CheckVerificationCodeResponse = server
        .post(&format!("/api/v1/sessions/{session_id}/check"))
        .json(&CheckVerificationCodeRequest {
            verification_code: "550100".to_owned(),
        })
        .await
        .json();
    assert!(checked.verified);

    // Replaying the same correct code stays verified, with no upstream round-trip (the
    // last-digits adapter has no upstream to call, but the orchestrator must not error).
    let replayed: CheckVerificationCodeResponse = server
        .post(&format!("/api/v1/sessions/{session_id}/check"))
        .json(&CheckVerificationCodeRequest {
            verification_code: "550100".to_owned(),
        })
        .await
        .json();
    assert!(replayed.verified);
}

#[tokio::test]
async fn wrong_code_reports_not_verified_without_error() {
    let server = setup::start_dev_server().await;

    let created: CreateSessionResponse = server
        .post("/api/v1/sessions")
        .json(&CreateSessionRequest { e164: US_NUMBER })
        .await
        .json();
    let session_id = created.session_metadata.expect("session created").session_id;

    server
        .post(&format!("/api/v1/sessions/{session_id}/send"))
        .json(&SendVerificationCodeRequest {
            transport: Transport::Sms,
            accept_language: None,
            client_type: None,
        })
        .await;

    let checked: CheckVerificationCodeResponse = server
        .post(&format!("/api/v1/sessions/{session_id}/check"))
        .json(&CheckVerificationCodeRequest {
            verification_code: "incorrect".to_owned(),
        })
        .await
        .json();
    assert!(!checked.verified);
    assert!(checked.error.is_none());
}

#[tokio::test]
async fn rate_limited_creation_reports_retry_after_and_creates_nothing() {
    let server =
        setup::start_server_denying_session_creation(std::time::Duration::from_secs(60)).await;

    let created: CreateSessionResponse = server
        .post("/api/v1/sessions")
        .json(&CreateSessionRequest { e164: US_NUMBER })
        .await
        .json();

    assert!(created.session_metadata.is_none());
    match created.error.clone() {
        Some(PublicError::RateLimited { retry_after }) => {
            assert_eq!(retry_after, std::time::Duration::from_secs(60));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
    assert!(created.error.unwrap().may_retry());
}

#[tokio::test]
async fn illegal_phone_number_is_rejected_without_a_session() {
    let server = setup::start_dev_server().await;

    let created: CreateSessionResponse = server
        .post("/api/v1/sessions")
        .json(&CreateSessionRequest { e164: 0 })
        .await
        .json();

    assert!(created.session_metadata.is_none());
    assert_eq!(created.error, Some(PublicError::IllegalPhoneNumber));
    assert!(!created.error.unwrap().may_retry());
}

#[tokio::test]
async fn unknown_session_metadata_reports_not_found() {
    let server = setup::start_dev_server().await;

    let unknown_id = SessionId::from_uuid(Uuid::new_v4());
    let response: GetSessionMetadataResponse = server
        .get(&format!("/api/v1/sessions/{unknown_id}"))
        .await
        .json();

    assert!(response.session_metadata.is_none());
    assert_eq!(response.error, Some(PublicError::NotFound));
}

#[tokio::test]
async fn send_after_verified_is_rejected_with_metadata_present() {
    let server = setup::start_dev_server().await;

    let created: CreateSessionResponse = server
        .post("/api/v1/sessions")
        .json(&CreateSessionRequest { e164: US_NUMBER })
        .await
        .json();
    let session_id = created.session_metadata.expect("session created").session_id;

    server
        .post(&format!("/api/v1/sessions/{session_id}/send"))
        .json(&SendVerificationCodeRequest {
            transport: Transport::Sms,
            accept_language: None,
            client_type: None,
        })
        .await;
    server
        .post(&format!("/api/v1/sessions/{session_id}/check"))
        .json(&CheckVerificationCodeRequest {
            verification_code: "550100".to_owned(),
        })
        .await;

    let second_send: SendVerificationCodeResponse = server
        .post(&format!("/api/v1/sessions/{session_id}/send"))
        .json(&SendVerificationCodeRequest {
            transport: Transport::Sms,
            accept_language: None,
            client_type: None,
        })
        .await
        .json();

    assert_eq!(second_send.error, Some(PublicError::SessionAlreadyVerified));
    assert!(!second_send.error.unwrap().may_retry());
    assert!(second_send.session_metadata.is_some());
}

#[tokio::test]
async fn sender_rejection_surfaces_as_sender_rejected() {
    let server = setup::start_server_with_rejecting_mock_upstream().await;

    let created: CreateSessionResponse = server
        .post("/api/v1/sessions")
        .json(&CreateSessionRequest { e164: US_NUMBER })
        .await
        .json();
    let session_id = created.session_metadata.expect("session created").session_id;

    let sent: SendVerificationCodeResponse = server
        .post(&format!("/api/v1/sessions/{session_id}/send"))
        .json(&SendVerificationCodeRequest {
            transport: Transport::Sms,
            accept_language: None,
            client_type: None,
        })
        .await
        .json();

    assert_eq!(sent.error, Some(PublicError::SenderRejected));
    assert!(!sent.error.unwrap().may_retry());
}

#[tokio::test]
async fn check_before_send_reports_no_code_sent() {
    let server = setup::start_dev_server().await;

    let created: CreateSessionResponse = server
        .post("/api/v1/sessions")
        .json(&CreateSessionRequest { e164: US_NUMBER })
        .await
        .json();
    let session_id = created.session_metadata.expect("session created").session_id;

    let checked: CheckVerificationCodeResponse = server
        .post(&format!("/api/v1/sessions/{session_id}/check"))
        .json(&CheckVerificationCodeRequest {
            verification_code: "anything".to_owned(),
        })
        .await
        .json();

    assert_eq!(checked.error, Some(PublicError::NoCodeSent));
    assert!(!checked.error.unwrap().may_retry());
    assert!(checked.session_metadata.is_some());
}

#[tokio::test]
async fn empty_verification_code_is_rejected_as_a_bad_request() {
    let server = setup::start_dev_server().await;

    let created: CreateSessionResponse = server
        .post("/api/v1/sessions")
        .json(&CreateSessionRequest { e164: US_NUMBER })
        .await
        .json();
    let session_id = created.session_metadata.expect("session created").session_id;

    server
        .post(&format!("/api/v1/sessions/{session_id}/send"))
        .json(&SendVerificationCodeRequest {
            transport: Transport::Sms,
            accept_language: None,
            client_type: None,
        })
        .await;

    let response = server
        .post(&format!("/api/v1/sessions/{session_id}/check"))
        .json(&CheckVerificationCodeRequest {
            verification_code: String::new(),
        })
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}
