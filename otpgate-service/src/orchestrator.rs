//! The verification orchestrator: the public operations `createSession`, `sendCode`,
//! `checkCode`, and `getSession`, composing the session store, rate limiters, adapter
//! registry, and selection strategy into the state machine described by the specification
//! this crate implements.
//!
//! None of the pure decision math lives here — that's [`otpgate_core`]. This module is the
//! async glue: it decides *when* to call the store, the limiters, and an adapter, retries CAS
//! conflicts and transient faults within a bounded budget, and translates every failure into
//! the public error taxonomy.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use otpgate_core::{
    RetryPolicy, RoutingTable, already_verified_by, apply_check_failure, apply_check_success,
    apply_send_failure, apply_send_success, retry_bounded, select_adapter, validate_check,
    validate_send,
};
use otpgate_types::api::v1::{
    CheckVerificationCodeResponse, SendVerificationCodeResponse, SessionMetadata,
};
use otpgate_types::session::{SendOutcome, Timestamp};
use otpgate_types::{
    ClientType, LanguageRanges, PhoneNumber, PublicError, SessionId, SessionRecord, Transport,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::metrics::{
    METRICS_ID_CAS_CONFLICTS, METRICS_ID_CHECK_ATTEMPTS, METRICS_ID_CHECK_DURATION,
    METRICS_ID_COMPLETION_RECORDS_DROPPED, METRICS_ID_RATE_LIMIT_DENIALS, METRICS_ID_SEND_ATTEMPTS,
    METRICS_ID_SEND_DURATION, METRICS_ID_SESSIONS_VERIFIED,
};
use crate::services::rate_limiters::RateLimiters;
use crate::services::sender_adapter::{AdapterError, AdapterRegistry};
use crate::services::session_store::{SessionStoreService, StoreError};

/// A terminal `checkCode` outcome, enqueued for the out-of-scope downstream analytics
/// pipeline. Nothing in this crate drains the receiving half; [`VerificationOrchestrator::new`]
/// hands it to the embedding application.
#[derive(Debug, Clone)]
pub struct CompletionRecord {
    /// The session that reached a terminal outcome.
    pub session_id: SessionId,
    /// The phone number the session verified.
    pub phone_number: PhoneNumber,
    /// Whether the session was successfully verified.
    pub verified: bool,
    /// Total number of check attempts recorded against the session.
    pub attempts: usize,
    /// Wall-clock time elapsed between session creation and this terminal outcome.
    pub elapsed: Duration,
}

/// A failure that prevents the orchestrator from producing an in-band response at all; the
/// HTTP layer maps these to status codes rather than to a [`PublicError`] response body.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorFault {
    /// The session id is unknown, or points to an expired session.
    #[error("session not found")]
    SessionNotFound,
    /// The caller's deadline/cancellation token fired before the call could complete.
    #[error("request cancelled")]
    Cancelled,
    /// The store (or an adapter) failed after the bounded retry budget was exhausted.
    #[error("service temporarily unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for OrchestratorFault {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => OrchestratorFault::SessionNotFound,
            StoreError::Conflict => OrchestratorFault::Unavailable("cas conflict".to_owned()),
            StoreError::Unavailable(reason) => OrchestratorFault::Unavailable(reason),
        }
    }
}

/// Configuration the orchestrator needs that is independent of which store/adapters/limiters
/// are wired in (those differ between `dev` and `prod`; this does not).
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// The session TTL assigned at `createSession`, before any send has occurred.
    pub default_session_ttl: Duration,
    /// Per-call budget before an adapter or store operation is treated as a timeout.
    pub upstream_call_timeout: Duration,
    /// Capacity of the bounded [`CompletionRecord`] channel.
    pub completion_channel_capacity: usize,
    /// Name of the adapter `/healthz` asserts is registered.
    pub default_adapter: String,
}

fn error_tag(err: &PublicError) -> &'static str {
    match err {
        PublicError::RateLimited { .. } => "RATE_LIMITED",
        PublicError::IllegalPhoneNumber => "ILLEGAL_PHONE_NUMBER",
        PublicError::SessionAlreadyVerified => "SESSION_ALREADY_VERIFIED",
        PublicError::NoCodeSent => "NO_CODE_SENT",
        PublicError::NotFound => "NOT_FOUND",
        PublicError::SenderIllegalArgument => "SENDER_ILLEGAL_ARGUMENT",
        PublicError::SenderRejected => "SENDER_REJECTED",
        PublicError::SenderUnavailable => "SENDER_UNAVAILABLE",
    }
}

fn adapter_error_to_public(err: &AdapterError) -> PublicError {
    match err {
        AdapterError::IllegalArgument(_) => PublicError::SenderIllegalArgument,
        AdapterError::Rejected(_) => PublicError::SenderRejected,
        AdapterError::Unavailable(_) => PublicError::SenderUnavailable,
    }
}

/// The settled outcome of a `createSession` call that did not fail infrastructurally.
///
/// Only [`PublicError::RateLimited`] and [`PublicError::IllegalPhoneNumber`] ever appear in
/// [`CreateSessionOutcome::Rejected`] — session creation never talks to a sender adapter, so no
/// other member of the public error taxonomy is reachable here.
#[derive(Debug, Clone)]
pub enum CreateSessionOutcome {
    /// The session was created.
    Created(SessionMetadata),
    /// The request was rejected in-band; no session was created.
    Rejected(PublicError),
}

fn session_metadata(record: &SessionRecord) -> SessionMetadata {
    SessionMetadata {
        session_id: record.session_id,
        e164: record.phone_number.clone(),
        verified: record.is_verified(),
    }
}

/// Composes the session store, rate limiters, adapter registry, and selection strategy into
/// the four public verification operations.
pub struct VerificationOrchestrator {
    settings: OrchestratorSettings,
    store: SessionStoreService,
    limiters: Arc<RateLimiters>,
    adapters: AdapterRegistry,
    routing: RoutingTable,
    completion_tx: mpsc::Sender<CompletionRecord>,
}

impl VerificationOrchestrator {
    /// Builds the orchestrator, returning it alongside the receiving half of the completion
    /// channel (handed to the embedding application; this crate never reads it).
    pub fn new(
        settings: OrchestratorSettings,
        store: SessionStoreService,
        limiters: Arc<RateLimiters>,
        adapters: AdapterRegistry,
        routing: RoutingTable,
    ) -> (Self, mpsc::Receiver<CompletionRecord>) {
        let (completion_tx, completion_rx) = mpsc::channel(settings.completion_channel_capacity);
        (
            Self {
                settings,
                store,
                limiters,
                adapters,
                routing,
                completion_tx,
            },
            completion_rx,
        )
    }

    async fn timed<T, Fut>(&self, fut: Fut) -> Result<T, OrchestratorFault>
    where
        Fut: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.settings.upstream_call_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(OrchestratorFault::Unavailable("store timed out".to_owned())),
        }
    }

    fn check_cancellation(cancellation: &CancellationToken) -> Result<(), OrchestratorFault> {
        if cancellation.is_cancelled() {
            Err(OrchestratorFault::Cancelled)
        } else {
            Ok(())
        }
    }

    /// `createSession`: parses the phone number, consults the `session-creation` limiter, and
    /// persists a fresh session with the configured default TTL.
    ///
    /// Only a store outage or cancellation surfaces as [`OrchestratorFault`] here; every other
    /// rejection (illegal number, rate limit) is in-band via [`CreateSessionOutcome::Rejected`].
    #[instrument(level = "debug", skip(self))]
    pub async fn create_session(
        &self,
        e164: u64,
        cancellation: &CancellationToken,
    ) -> Result<CreateSessionOutcome, OrchestratorFault> {
        let phone_number = match PhoneNumber::from_e164_u64(e164) {
            Ok(number) => number,
            Err(_) => {
                tracing::debug!(e164, "rejecting illegal phone number");
                return Ok(CreateSessionOutcome::Rejected(PublicError::IllegalPhoneNumber));
            }
        };

        let now = Timestamp::now();
        let key = RateLimiters::session_creation_key(&phone_number);
        if let otpgate_core::RateLimitDecision::Denied { retry_after } =
            self.limiters.session_creation.check(key, now)
        {
            metrics::counter!(METRICS_ID_RATE_LIMIT_DENIALS, "limiter" => "session-creation")
                .increment(1);
            return Ok(CreateSessionOutcome::Rejected(PublicError::RateLimited {
                retry_after,
            }));
        }

        Self::check_cancellation(cancellation)?;

        let session_id = SessionId::generate();
        let record = SessionRecord::new(
            session_id,
            phone_number,
            self.settings.default_session_ttl,
        );
        let metadata = session_metadata(&record);

        self.timed(self.store.create(record)).await?;

        Ok(CreateSessionOutcome::Created(metadata))
    }

    /// `getSessionMetadata`: a pure read.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_session(
        &self,
        session_id: SessionId,
    ) -> Result<SessionMetadata, OrchestratorFault> {
        let record = self.timed(self.store.get(session_id, Timestamp::now())).await?;
        Ok(session_metadata(&record))
    }

    /// Reports whether the store answers and the configured default adapter is registered.
    /// Backs the `/healthz` endpoint.
    pub async fn is_healthy(&self) -> bool {
        if !self.adapters.has_all(&[self.settings.default_adapter.as_str()]) {
            return false;
        }
        matches!(
            self.store.get(SessionId::generate(), Timestamp::now()).await,
            Ok(_) | Err(StoreError::NotFound)
        )
    }

    fn pick_adapter(
        &self,
        session: &SessionRecord,
        transport: Transport,
        language_ranges: &LanguageRanges,
        client_type: &ClientType,
    ) -> Result<String, PublicError> {
        let candidates = self.adapters.candidates(
            transport,
            &session.phone_number,
            language_ranges,
            client_type,
        );
        let candidate_refs: Vec<&str> = candidates.iter().map(String::as_str).collect();
        select_adapter(
            &candidate_refs,
            session.sender_name.as_deref(),
            &self.routing,
            Some(session.phone_number.calling_code()),
            transport.tag(),
        )
        .map_err(|_| PublicError::SenderUnavailable)
    }

    /// `sendVerificationCode`: dispatches a code for `session_id` over `transport`.
    #[instrument(level = "debug", skip(self, language_ranges, cancellation))]
    pub async fn send_code(
        &self,
        session_id: SessionId,
        transport: Transport,
        language_ranges: LanguageRanges,
        client_type: ClientType,
        cancellation: &CancellationToken,
    ) -> Result<SendVerificationCodeResponse, OrchestratorFault> {
        let started = std::time::Instant::now();
        let result = self
            .send_code_inner(session_id, transport, language_ranges, client_type, cancellation)
            .await;
        metrics::histogram!(METRICS_ID_SEND_DURATION).record(started.elapsed().as_secs_f64() * 1000.0);
        result
    }

    async fn send_code_inner(
        &self,
        session_id: SessionId,
        transport: Transport,
        language_ranges: LanguageRanges,
        client_type: ClientType,
        cancellation: &CancellationToken,
    ) -> Result<SendVerificationCodeResponse, OrchestratorFault> {
        let now = Timestamp::now();
        let session = self.timed(self.store.get(session_id, now)).await?;

        if let Err(err) = validate_send(&session) {
            return Ok(SendVerificationCodeResponse {
                session_id,
                session_metadata: Some(session_metadata(&session)),
                error: Some(err),
            });
        }

        let (per_number, per_session) = match transport {
            Transport::Sms => (
                &self.limiters.send_sms_per_number,
                &self.limiters.send_sms_per_session,
            ),
            Transport::Voice => (
                &self.limiters.send_voice_per_number,
                &self.limiters.send_voice_per_session,
            ),
        };
        if let otpgate_core::RateLimitDecision::Denied { retry_after } =
            per_number.check(session.phone_number.to_e164_u64(), now)
        {
            metrics::counter!(METRICS_ID_RATE_LIMIT_DENIALS, "limiter" => "send-per-number")
                .increment(1);
            return Ok(SendVerificationCodeResponse {
                session_id,
                session_metadata: Some(session_metadata(&session)),
                error: Some(PublicError::RateLimited { retry_after }),
            });
        }
        if let otpgate_core::RateLimitDecision::Denied { retry_after } =
            per_session.check(session_id, now)
        {
            metrics::counter!(METRICS_ID_RATE_LIMIT_DENIALS, "limiter" => "send-per-session")
                .increment(1);
            return Ok(SendVerificationCodeResponse {
                session_id,
                session_metadata: Some(session_metadata(&session)),
                error: Some(PublicError::RateLimited { retry_after }),
            });
        }

        Self::check_cancellation(cancellation)?;

        let adapter_name = match self.pick_adapter(&session, transport, &language_ranges, &client_type) {
            Ok(name) => name,
            Err(err) => {
                return Ok(SendVerificationCodeResponse {
                    session_id,
                    session_metadata: Some(session_metadata(&session)),
                    error: Some(err),
                });
            }
        };
        let adapter = self
            .adapters
            .get(&adapter_name)
            .expect("selection strategy only returns registered adapter names");

        let send_result = tokio::time::timeout(
            self.settings.upstream_call_timeout,
            adapter.send(transport, &session.phone_number, &language_ranges, &client_type),
        )
        .await;

        let send_result = match send_result {
            Ok(result) => result,
            Err(_) => Err(AdapterError::Unavailable("adapter send timed out".to_owned())),
        };

        match send_result {
            Ok(payload) => {
                let updated = self
                    .commit_send_success(session_id, transport, &adapter_name, payload, now)
                    .await?;
                metrics::counter!(
                    METRICS_ID_SEND_ATTEMPTS,
                    "transport" => transport.tag(),
                    "outcome" => "success"
                )
                .increment(1);
                Ok(SendVerificationCodeResponse {
                    session_id,
                    session_metadata: Some(session_metadata(&updated)),
                    error: None,
                })
            }
            Err(adapter_err) => {
                let public_err = adapter_error_to_public(&adapter_err);
                let outcome = if public_err.may_retry() {
                    SendOutcome::Transient {
                        reason: error_tag(&public_err).to_owned(),
                    }
                } else {
                    SendOutcome::Rejected {
                        reason: error_tag(&public_err).to_owned(),
                    }
                };
                let updated = self
                    .commit_send_failure(session_id, transport, &adapter_name, outcome, now)
                    .await?;
                metrics::counter!(
                    METRICS_ID_SEND_ATTEMPTS,
                    "transport" => transport.tag(),
                    "outcome" => error_tag(&public_err)
                )
                .increment(1);
                Ok(SendVerificationCodeResponse {
                    session_id,
                    session_metadata: Some(session_metadata(&updated)),
                    error: Some(public_err),
                })
            }
        }
    }

    async fn commit_send_success(
        &self,
        session_id: SessionId,
        transport: Transport,
        adapter_name: &str,
        payload: Vec<u8>,
        now: Timestamp,
    ) -> Result<SessionRecord, OrchestratorFault> {
        let session_ttl = self
            .adapters
            .get(adapter_name)
            .expect("adapter resolved just above")
            .session_ttl();
        self.retry_update(session_id, now, move |current| {
            apply_send_success(current, transport, adapter_name, payload.clone(), session_ttl, now)
        })
        .await
    }

    async fn commit_send_failure(
        &self,
        session_id: SessionId,
        transport: Transport,
        adapter_name: &str,
        outcome: SendOutcome,
        now: Timestamp,
    ) -> Result<SessionRecord, OrchestratorFault> {
        self.retry_update(session_id, now, move |current| {
            apply_send_failure(current, transport, adapter_name, outcome.clone(), now)
        })
        .await
    }

    async fn retry_update<F>(
        &self,
        session_id: SessionId,
        now: Timestamp,
        mutator: F,
    ) -> Result<SessionRecord, OrchestratorFault>
    where
        F: Fn(&SessionRecord) -> SessionRecord + Send + Sync,
    {
        let store = Arc::clone(&self.store);
        let result = retry_bounded(
            RetryPolicy::cas_conflict(),
            |err: &StoreError| matches!(err, StoreError::Conflict),
            || {
                let store = Arc::clone(&store);
                let mutator = &mutator;
                async move {
                    let result = store
                        .update(session_id, now, &|current| mutator(current))
                        .await;
                    if matches!(result, Err(StoreError::Conflict)) {
                        metrics::counter!(METRICS_ID_CAS_CONFLICTS).increment(1);
                    }
                    result
                }
            },
        )
        .await;
        Ok(result?)
    }

    /// `checkVerificationCode`: checks `submitted_code` against `session_id`'s stored payload.
    #[instrument(level = "debug", skip(self, submitted_code, cancellation))]
    pub async fn check_code(
        &self,
        session_id: SessionId,
        submitted_code: &str,
        cancellation: &CancellationToken,
    ) -> CheckVerificationCodeResponse {
        let started = std::time::Instant::now();
        let result = self.check_code_inner(session_id, submitted_code, cancellation).await;
        metrics::histogram!(METRICS_ID_CHECK_DURATION).record(started.elapsed().as_secs_f64() * 1000.0);
        result
    }

    async fn check_code_inner(
        &self,
        session_id: SessionId,
        submitted_code: &str,
        cancellation: &CancellationToken,
    ) -> CheckVerificationCodeResponse {
        let now = Timestamp::now();
        let session = match self.store.get(session_id, now).await {
            Ok(session) => session,
            Err(_) => {
                // The distilled spec deliberately does not distinguish "missing" from
                // "unverified" at this operation.
                return CheckVerificationCodeResponse {
                    verified: false,
                    session_metadata: None,
                    error: None,
                };
            }
        };

        if already_verified_by(&session, submitted_code) {
            return CheckVerificationCodeResponse {
                verified: true,
                session_metadata: Some(session_metadata(&session)),
                error: None,
            };
        }

        if let Err(err) = validate_check(&session) {
            return CheckVerificationCodeResponse {
                verified: false,
                session_metadata: Some(session_metadata(&session)),
                error: Some(err),
            };
        }

        if let otpgate_core::RateLimitDecision::Denied { retry_after } = self
            .limiters
            .check_per_number
            .check(session.phone_number.to_e164_u64(), now)
        {
            metrics::counter!(METRICS_ID_RATE_LIMIT_DENIALS, "limiter" => "check-per-number")
                .increment(1);
            return CheckVerificationCodeResponse {
                verified: false,
                session_metadata: Some(session_metadata(&session)),
                error: Some(PublicError::RateLimited { retry_after }),
            };
        }
        if let otpgate_core::RateLimitDecision::Denied { retry_after } =
            self.limiters.check_per_session.check(session_id, now)
        {
            metrics::counter!(METRICS_ID_RATE_LIMIT_DENIALS, "limiter" => "check-per-session")
                .increment(1);
            return CheckVerificationCodeResponse {
                verified: false,
                session_metadata: Some(session_metadata(&session)),
                error: Some(PublicError::RateLimited { retry_after }),
            };
        }

        if Self::check_cancellation(cancellation).is_err() {
            return CheckVerificationCodeResponse {
                verified: false,
                session_metadata: Some(session_metadata(&session)),
                error: Some(PublicError::SenderUnavailable),
            };
        }

        let adapter = match self.adapters.get(
            session
                .sender_name
                .as_deref()
                .expect("validate_check already ensured sender_data is set"),
        ) {
            Some(adapter) => adapter,
            None => {
                return CheckVerificationCodeResponse {
                    verified: false,
                    session_metadata: Some(session_metadata(&session)),
                    error: Some(PublicError::SenderUnavailable),
                };
            }
        };
        let stored_payload = session
            .sender_data
            .as_deref()
            .expect("validate_check already ensured sender_data is set");

        let check_result = tokio::time::timeout(
            self.settings.upstream_call_timeout,
            adapter.check(submitted_code, stored_payload),
        )
        .await;
        let check_result = match check_result {
            Ok(result) => result,
            Err(_) => Err(AdapterError::Unavailable("adapter check timed out".to_owned())),
        };

        match check_result {
            Ok(true) => {
                let updated = match self
                    .retry_update(session_id, now, {
                        let submitted_code = submitted_code.to_owned();
                        move |current| apply_check_success(current, &submitted_code, now)
                    })
                    .await
                {
                    Ok(updated) => updated,
                    Err(_) => {
                        return CheckVerificationCodeResponse {
                            verified: false,
                            session_metadata: Some(session_metadata(&session)),
                            error: Some(PublicError::SenderUnavailable),
                        };
                    }
                };
                metrics::counter!(METRICS_ID_CHECK_ATTEMPTS, "outcome" => "success").increment(1);
                metrics::counter!(METRICS_ID_SESSIONS_VERIFIED).increment(1);
                self.enqueue_completion(&updated, now);
                CheckVerificationCodeResponse {
                    verified: true,
                    session_metadata: Some(session_metadata(&updated)),
                    error: None,
                }
            }
            Ok(false) => {
                let updated = self
                    .retry_update(session_id, now, move |current| {
                        apply_check_failure(current, now)
                    })
                    .await
                    .unwrap_or_else(|_| session.clone());
                metrics::counter!(METRICS_ID_CHECK_ATTEMPTS, "outcome" => "failed").increment(1);
                CheckVerificationCodeResponse {
                    verified: false,
                    session_metadata: Some(session_metadata(&updated)),
                    error: None,
                }
            }
            Err(adapter_err) => {
                let public_err = adapter_error_to_public(&adapter_err);
                metrics::counter!(
                    METRICS_ID_CHECK_ATTEMPTS,
                    "outcome" => error_tag(&public_err)
                )
                .increment(1);
                CheckVerificationCodeResponse {
                    verified: false,
                    session_metadata: Some(session_metadata(&session)),
                    error: Some(public_err),
                }
            }
        }
    }

    fn enqueue_completion(&self, session: &SessionRecord, now: Timestamp) {
        let record = CompletionRecord {
            session_id: session.session_id,
            phone_number: session.phone_number.clone(),
            verified: session.is_verified(),
            attempts: session.check_attempts.len(),
            elapsed: now.saturating_duration_since(session.created_at),
        };
        if self.completion_tx.try_send(record).is_err() {
            metrics::counter!(METRICS_ID_COMPLETION_RECORDS_DROPPED).increment(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use otpgate_core::LimiterSchedule;

    use super::*;
    use crate::services::sender_adapter::last_digits::LastDigitsAdapter;
    use crate::services::session_store::in_memory::InMemorySessionStore;

    fn orchestrator() -> VerificationOrchestrator {
        let store: SessionStoreService = Arc::new(InMemorySessionStore::new());
        let limiters = Arc::new(RateLimiters::allow_all());
        let adapters = AdapterRegistry::new(vec![Arc::new(LastDigitsAdapter::new(
            Duration::from_secs(300),
        ))]);
        let routing = RoutingTable::with_default("last-digits");
        let settings = OrchestratorSettings {
            default_session_ttl: Duration::from_secs(300),
            upstream_call_timeout: Duration::from_secs(5),
            completion_channel_capacity: 16,
            default_adapter: "last-digits".to_owned(),
        };
        let (orchestrator, _rx) =
            VerificationOrchestrator::new(settings, store, limiters, adapters, routing);
        orchestrator
    }

    fn created(outcome: CreateSessionOutcome) -> SessionMetadata {
        match outcome {
            CreateSessionOutcome::Created(metadata) => metadata,
            CreateSessionOutcome::Rejected(err) => panic!("expected Created, got Rejected({err:?})"),
        }
    }

    #[tokio::test]
    async fn happy_path_create_send_check() {
        let orchestrator = orchestrator();
        let token = CancellationToken::new();

        let metadata = created(
            orchestrator
                .create_session(15555550100, &token)
                .await
                .unwrap(),
        );
        assert!(!metadata.verified);

        let send = orchestrator
            .send_code(
                metadata.session_id,
                Transport::Sms,
                LanguageRanges::default(),
                ClientType::unknown(),
                &token,
            )
            .await
            .unwrap();
        assert!(send.error.is_none());

        let check = orchestrator
            .check_code(metadata.session_id, "550100", &token)
            .await;
        assert!(check.verified);

        // Idempotent re-verification.
        let check_again = orchestrator
            .check_code(metadata.session_id, "550100", &token)
            .await;
        assert!(check_again.verified);
    }

    #[tokio::test]
    async fn wrong_code_is_not_verified_without_error() {
        let orchestrator = orchestrator();
        let token = CancellationToken::new();
        let metadata = created(
            orchestrator
                .create_session(15555550100, &token)
                .await
                .unwrap(),
        );
        orchestrator
            .send_code(
                metadata.session_id,
                Transport::Sms,
                LanguageRanges::default(),
                ClientType::unknown(),
                &token,
            )
            .await
            .unwrap();

        let check = orchestrator
            .check_code(metadata.session_id, "incorrect", &token)
            .await;
        assert!(!check.verified);
        assert!(check.error.is_none());
    }

    #[tokio::test]
    async fn illegal_phone_number_is_rejected() {
        let orchestrator = orchestrator();
        let token = CancellationToken::new();
        let outcome = orchestrator.create_session(0, &token).await.unwrap();
        let err = match outcome {
            CreateSessionOutcome::Rejected(err) => err,
            CreateSessionOutcome::Created(_) => panic!("expected Rejected, got Created"),
        };
        assert_eq!(err, PublicError::IllegalPhoneNumber);
        assert!(!err.may_retry());
    }

    #[tokio::test]
    async fn rate_limited_creation_does_not_mutate_state() {
        let store: SessionStoreService = Arc::new(InMemorySessionStore::new());
        let mut limiters = RateLimiters::allow_all();
        limiters.session_creation = otpgate_core::RateLimiter::new(LimiterSchedule {
            max_attempts: 0,
            window: Duration::from_secs(60),
            backoff_base: Duration::from_secs(60),
            max_backoff: Duration::from_secs(60),
        });
        let adapters = AdapterRegistry::new(vec![Arc::new(LastDigitsAdapter::new(
            Duration::from_secs(300),
        ))]);
        let routing = RoutingTable::with_default("last-digits");
        let settings = OrchestratorSettings {
            default_session_ttl: Duration::from_secs(300),
            upstream_call_timeout: Duration::from_secs(5),
            completion_channel_capacity: 16,
            default_adapter: "last-digits".to_owned(),
        };
        let (orchestrator, _rx) =
            VerificationOrchestrator::new(settings, store, Arc::new(limiters), adapters, routing);

        let token = CancellationToken::new();
        let outcome = orchestrator
            .create_session(15555550100, &token)
            .await
            .unwrap();
        let err = match outcome {
            CreateSessionOutcome::Rejected(err) => err,
            CreateSessionOutcome::Created(_) => panic!("expected Rejected, got Created"),
        };
        assert_eq!(
            err,
            PublicError::RateLimited {
                retry_after: Duration::from_secs(60)
            }
        );
    }

    #[tokio::test]
    async fn send_after_verified_is_rejected_without_mutating_sender_data() {
        let orchestrator = orchestrator();
        let token = CancellationToken::new();
        let metadata = created(
            orchestrator
                .create_session(15555550100, &token)
                .await
                .unwrap(),
        );
        orchestrator
            .send_code(
                metadata.session_id,
                Transport::Sms,
                LanguageRanges::default(),
                ClientType::unknown(),
                &token,
            )
            .await
            .unwrap();
        orchestrator
            .check_code(metadata.session_id, "550100", &token)
            .await;

        let send = orchestrator
            .send_code(
                metadata.session_id,
                Transport::Sms,
                LanguageRanges::default(),
                ClientType::unknown(),
                &token,
            )
            .await
            .unwrap();
        assert_eq!(send.error, Some(PublicError::SessionAlreadyVerified));
    }

    #[tokio::test]
    async fn check_before_send_fails_with_no_code_sent() {
        let orchestrator = orchestrator();
        let token = CancellationToken::new();
        let metadata = created(
            orchestrator
                .create_session(15555550100, &token)
                .await
                .unwrap(),
        );

        let check = orchestrator
            .check_code(metadata.session_id, "anything", &token)
            .await;
        assert_eq!(check.error, Some(PublicError::NoCodeSent));
        assert!(check.session_metadata.is_some());
    }

    #[tokio::test]
    async fn unknown_session_metadata_is_not_found() {
        let orchestrator = orchestrator();
        let err = orchestrator.get_session(SessionId::generate()).await;
        assert!(matches!(err, Err(OrchestratorFault::SessionNotFound)));
    }
}
