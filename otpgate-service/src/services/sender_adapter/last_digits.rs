//! `last-digits` — a provided-code adapter for development and integration tests.
//!
//! The "code" is simply the last six digits of the phone number; `send` never actually talks
//! to a network, and `check` is a byte-equality comparison against the stored payload.

use std::time::Duration;

use async_trait::async_trait;
use otpgate_types::{ClientType, LanguageRanges, PhoneNumber, Transport};

use super::{AdapterError, SenderAdapter};

/// Adapter name, persisted into `senderName`.
pub const NAME: &str = "last-digits";

/// The provided-code `last-digits` adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastDigitsAdapter {
    session_ttl: Duration,
}

impl LastDigitsAdapter {
    /// Builds the adapter with the given session TTL (extended on every successful send).
    pub fn new(session_ttl: Duration) -> Self {
        Self { session_ttl }
    }
}

#[async_trait]
impl SenderAdapter for LastDigitsAdapter {
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
        Ok(phone_number.last_digits(6).into_bytes())
    }

    async fn check(&self, submitted_code: &str, stored_payload: &[u8]) -> Result<bool, AdapterError> {
        Ok(submitted_code.as_bytes() == stored_payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone() -> PhoneNumber {
        PhoneNumber::from_e164_u64(15555550100).unwrap()
    }

    #[tokio::test]
    async fn send_returns_last_six_digits() {
        let adapter = LastDigitsAdapter::new(Duration::from_secs(300));
        let payload = adapter
            .send(Transport::Sms, &phone(), &LanguageRanges::default(), &ClientType::unknown())
            .await
            .unwrap();
        assert_eq!(payload, b"550100");
    }

    #[tokio::test]
    async fn check_accepts_matching_code_and_rejects_others() {
        let adapter = LastDigitsAdapter::new(Duration::from_secs(300));
        let payload = b"550100".to_vec();
        assert!(adapter.check("550100", &payload).await.unwrap());
        assert!(!adapter.check("000000", &payload).await.unwrap());
    }

    #[tokio::test]
    async fn supports_every_transport_and_client() {
        let adapter = LastDigitsAdapter::new(Duration::from_secs(300));
        assert!(adapter.supports(
            Transport::Voice,
            &phone(),
            &LanguageRanges::default(),
            &ClientType::unknown()
        ));
    }
}
