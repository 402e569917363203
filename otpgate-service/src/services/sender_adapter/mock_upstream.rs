//! `mock-upstream` — a delegated adapter simulating a provider whose SDK only exposes
//! "start verification" / "check verification" calls keyed by an opaque handle.
//!
//! The SDK call itself is modeled by an injectable [`UpstreamBehavior`] rather than a live
//! network client, so tests can script rejections, transient failures, and delayed acceptance
//! deterministically. The behavior is invoked via `tokio::task::spawn_blocking`, mirroring how
//! a real adapter would keep a blocking SDK client off the async executor.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use otpgate_types::{ClientType, LanguageRanges, PhoneNumber, Transport};

use super::{AdapterError, SenderAdapter};

/// Adapter name, persisted into `senderName`.
pub const NAME: &str = "mock-upstream";

/// The outcome a scripted [`UpstreamBehavior`] should produce for `start_verification`.
#[derive(Debug, Clone)]
pub enum StartVerificationOutcome {
    /// Upstream accepted the request and returned an opaque handle.
    Accepted,
    /// Upstream rejected the request as malformed.
    IllegalArgument(String),
    /// Upstream refused for policy/destination reasons.
    Rejected(String),
    /// Upstream failed transiently.
    Unavailable(String),
}

/// The outcome a scripted [`UpstreamBehavior`] should produce for `check_verification`.
#[derive(Debug, Clone)]
pub enum CheckVerificationOutcome {
    /// The submitted code matched.
    Match,
    /// The submitted code did not match.
    NoMatch,
    /// Upstream failed transiently.
    Unavailable(String),
}

/// A scriptable stand-in for a blocking upstream SDK client.
///
/// Implementations must be `Send + Sync + 'static` since they are invoked from inside
/// `tokio::task::spawn_blocking`.
pub trait UpstreamBehavior: Send + Sync + 'static {
    /// Simulates the SDK's "start verification" call.
    fn start_verification(&self, submitted_to: &str) -> StartVerificationOutcome;
    /// Simulates the SDK's "check verification" call for the handle embedded in `handle`.
    fn check_verification(&self, handle: &str, submitted_code: &str) -> CheckVerificationOutcome;
}

/// The default [`UpstreamBehavior`]: always accepts, and matches any code against a fixed
/// digit string baked into the handle at `start_verification` time. Useful as a sane default
/// for local development; integration tests typically supply their own scripted behavior.
pub struct AlwaysAcceptBehavior;

impl UpstreamBehavior for AlwaysAcceptBehavior {
    fn start_verification(&self, _submitted_to: &str) -> StartVerificationOutcome {
        StartVerificationOutcome::Accepted
    }

    fn check_verification(&self, handle: &str, submitted_code: &str) -> CheckVerificationOutcome {
        if handle.ends_with(submitted_code) {
            CheckVerificationOutcome::Match
        } else {
            CheckVerificationOutcome::NoMatch
        }
    }
}

/// The delegated `mock-upstream` adapter.
pub struct MockUpstreamAdapter {
    session_ttl: Duration,
    behavior: Arc<dyn UpstreamBehavior>,
    next_handle: AtomicU64,
}

impl MockUpstreamAdapter {
    /// Builds the adapter with a given session TTL and scripted upstream behavior.
    pub fn new(session_ttl: Duration, behavior: Arc<dyn UpstreamBehavior>) -> Self {
        Self {
            session_ttl,
            behavior,
            next_handle: AtomicU64::new(1),
        }
    }

    /// Builds the adapter wired to [`AlwaysAcceptBehavior`].
    pub fn always_accept(session_ttl: Duration) -> Self {
        Self::new(session_ttl, Arc::new(AlwaysAcceptBehavior))
    }
}

#[async_trait]
impl SenderAdapter for MockUpstreamAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    fn supports(
        &self,
        _transport: Transport,
        _phone_number: &PhoneNumber,
        _language_ranges: &LanguageRanges,
        _client_type: &ClientType,
    ) -> bool {
        true
    }

    async fn send(
        &self,
        _transport: Transport,
        phone_number: &PhoneNumber,
        _language_ranges: &LanguageRanges,
        _client_type: &ClientType,
    ) -> Result<Vec<u8>, AdapterError> {
        let behavior = Arc::clone(&self.behavior);
        let destination = phone_number.to_string();
        let handle_seq = self.next_handle.fetch_add(1, Ordering::Relaxed);

        let outcome = tokio::task::spawn_blocking(move || behavior.start_verification(&destination))
            .await
            .map_err(|err| AdapterError::Unavailable(format!("mock-upstream task panicked: {err}")))?;

        match outcome {
            StartVerificationOutcome::Accepted => {
                Ok(format!("handle-{handle_seq}").into_bytes())
            }
            StartVerificationOutcome::IllegalArgument(reason) => {
                Err(AdapterError::IllegalArgument(reason))
            }
            StartVerificationOutcome::Rejected(reason) => Err(AdapterError::Rejected(reason)),
            StartVerificationOutcome::Unavailable(reason) => Err(AdapterError::Unavailable(reason)),
        }
    }

    async fn check(&self, submitted_code: &str, stored_payload: &[u8]) -> Result<bool, AdapterError> {
        let behavior = Arc::clone(&self.behavior);
        let handle = String::from_utf8_lossy(stored_payload).into_owned();
        let submitted_code = submitted_code.to_owned();

        let outcome =
            tokio::task::spawn_blocking(move || behavior.check_verification(&handle, &submitted_code))
                .await
                .map_err(|err| {
                    AdapterError::Unavailable(format!("mock-upstream task panicked: {err}"))
                })?;

        match outcome {
            CheckVerificationOutcome::Match => Ok(true),
            CheckVerificationOutcome::NoMatch => Ok(false),
            CheckVerificationOutcome::Unavailable(reason) => Err(AdapterError::Unavailable(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone() -> PhoneNumber {
        PhoneNumber::from_e164_u64(15555550100).unwrap()
    }

    struct ScriptedBehavior {
        start: StartVerificationOutcome,
    }

    impl UpstreamBehavior for ScriptedBehavior {
        fn start_verification(&self, _submitted_to: &str) -> StartVerificationOutcome {
            self.start.clone()
        }

        fn check_verification(&self, _handle: &str, _submitted_code: &str) -> CheckVerificationOutcome {
            CheckVerificationOutcome::Match
        }
    }

    #[tokio::test]
    async fn send_success_returns_opaque_handle() {
        let adapter = MockUpstreamAdapter::always_accept(Duration::from_secs(300));
        let payload = adapter
            .send(
                Transport::Sms,
                &phone(),
                &LanguageRanges::default(),
                &ClientType::unknown(),
            )
            .await
            .unwrap();
        assert!(payload.starts_with(b"handle-"));
    }

    #[tokio::test]
    async fn send_surfaces_scripted_rejection() {
        let adapter = MockUpstreamAdapter::new(
            Duration::from_secs(300),
            Arc::new(ScriptedBehavior {
                start: StartVerificationOutcome::Rejected("blocked destination".to_owned()),
            }),
        );
        let err = adapter
            .send(
                Transport::Sms,
                &phone(),
                &LanguageRanges::default(),
                &ClientType::unknown(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Rejected(_)));
    }

    #[tokio::test]
    async fn check_delegates_to_behavior() {
        let adapter = MockUpstreamAdapter::always_accept(Duration::from_secs(300));
        assert!(adapter.check("550100", b"handle-1-550100").await.unwrap());
        assert!(!adapter.check("000000", b"handle-1-550100").await.unwrap());
    }
}
