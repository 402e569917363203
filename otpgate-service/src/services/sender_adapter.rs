//! The sender-adapter contract: a uniform four-method interface over upstream SMS/voice
//! delivery providers, plus the closed, immutable registry the orchestrator resolves them
//! through.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use otpgate_types::{ClientType, LanguageRanges, PhoneNumber, Transport};

pub mod last_digits;
pub mod mock_upstream;

/// Errors an adapter may raise from `send`/`check`, mapped by the orchestrator to the public
/// error taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Upstream rejected the request as malformed. Maps to `SENDER_ILLEGAL_ARGUMENT`.
    #[error("illegal argument: {0}")]
    IllegalArgument(String),
    /// Upstream refused for policy or destination reasons. Maps to `SENDER_REJECTED`.
    #[error("rejected: {0}")]
    Rejected(String),
    /// Upstream failed transiently; the caller may retry. Maps to `SENDER_UNAVAILABLE`.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// A dynamic trait object for a sender adapter, shared across the service.
pub type SenderAdapterHandle = Arc<dyn SenderAdapter + Send + Sync>;

/// A plug-in that knows how to deliver and later validate a one-time code through one upstream
/// provider.
///
/// Implementations fall into two families: **provided-code** (the adapter itself generates the
/// code; `sender_data` holds the literal code; `check` is a byte comparison) and **delegated**
/// (upstream owns code generation and validation; `sender_data` holds an opaque handle; `check`
/// round-trips to upstream).
#[async_trait]
pub trait SenderAdapter {
    /// Stable, unique adapter name, persisted into the session as `senderName`.
    fn name(&self) -> &str;

    /// The session lifetime this adapter requires after a successful send.
    fn session_ttl(&self) -> Duration;

    /// Whether this adapter can serve a send request with these parameters.
    fn supports(
        &self,
        transport: Transport,
        phone_number: &PhoneNumber,
        language_ranges: &LanguageRanges,
        client_type: &ClientType,
    ) -> bool;

    /// Dispatches a verification code and returns the opaque payload to persist as
    /// `senderData`.
    async fn send(
        &self,
        transport: Transport,
        phone_number: &PhoneNumber,
        language_ranges: &LanguageRanges,
        client_type: &ClientType,
    ) -> Result<Vec<u8>, AdapterError>;

    /// Checks `submitted_code` against the adapter-owned meaning of `stored_payload`.
    async fn check(&self, submitted_code: &str, stored_payload: &[u8]) -> Result<bool, AdapterError>;
}

/// A closed, immutable map from adapter name to adapter, built once at start-up and never
/// mutated afterward. Lookup is a pure, side-effect-free map access.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: Arc<HashMap<String, SenderAdapterHandle>>,
}

impl AdapterRegistry {
    /// Builds a registry from a fixed set of adapters, keyed by their own
    /// [`SenderAdapter::name`].
    pub fn new(adapters: Vec<SenderAdapterHandle>) -> Self {
        Self {
            adapters: Arc::new(
                adapters
                    .into_iter()
                    .map(|adapter| (adapter.name().to_owned(), adapter))
                    .collect(),
            ),
        }
    }

    /// Looks up an adapter by name.
    pub fn get(&self, name: &str) -> Option<SenderAdapterHandle> {
        self.adapters.get(name).cloned()
    }

    /// Returns the names of every adapter that `supports(...)` the given request, in the
    /// registry's stable iteration order (insertion order is not preserved by `HashMap`, so
    /// callers that need determinism should sort the result or rely on the routing table).
    pub fn candidates(
        &self,
        transport: Transport,
        phone_number: &PhoneNumber,
        language_ranges: &LanguageRanges,
        client_type: &ClientType,
    ) -> Vec<String> {
        let mut names: Vec<String> = self
            .adapters
            .values()
            .filter(|adapter| {
                adapter.supports(transport, phone_number, language_ranges, client_type)
            })
            .map(|adapter| adapter.name().to_owned())
            .collect();
        names.sort();
        names
    }

    /// Returns `true` iff every adapter in `names` is registered — used by the `/healthz`
    /// endpoint to assert the configured default/routed adapters actually exist.
    pub fn has_all(&self, names: &[&str]) -> bool {
        names.iter().all(|name| self.adapters.contains_key(*name))
    }
}
