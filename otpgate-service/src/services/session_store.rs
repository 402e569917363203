//! The durable session-record store: a compare-and-swap key/value contract with two
//! implementations, in-memory (dev/tests) and Postgres (production-shaped).

use std::sync::Arc;

use async_trait::async_trait;
use otpgate_types::session::Timestamp;
use otpgate_types::{SessionId, SessionRecord};

#[cfg(feature = "postgres")]
pub mod postgres;

/// Failure modes of a [`SessionStore`] operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record exists for this id, or it has expired.
    #[error("session not found")]
    NotFound,
    /// The record's version changed between read and write; the caller should retry.
    #[error("compare-and-swap conflict")]
    Conflict,
    /// The backing store is unreachable or returned an unexpected error.
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// A trait object over a [`SessionStore`] implementation, shared across the service.
pub type SessionStoreService = Arc<dyn SessionStore + Send + Sync>;

/// Durable map from session id to session record, with compare-and-swap updates.
///
/// Implementations must treat a record whose `expires_at` is before the caller-supplied `now`
/// as if it did not exist (invariant 4): `get` returns [`StoreError::NotFound`] and `update`
/// must not succeed against it.
#[async_trait]
pub trait SessionStore {
    /// Persists `record`, which already carries its assigned [`SessionId`].
    ///
    /// Fails only on storage outage ([`StoreError::Unavailable`]); the caller is responsible
    /// for picking the random session id.
    async fn create(&self, record: SessionRecord) -> Result<(), StoreError>;

    /// Reads the current record for `id`, treating expiry relative to `now`.
    async fn get(&self, id: SessionId, now: Timestamp) -> Result<SessionRecord, StoreError>;

    /// Reads the current record, applies `mutator` to it, and writes the result back if and
    /// only if no other writer has changed the record's `version` in the meantime.
    ///
    /// `mutator` must be pure: it may be invoked zero or more times (zero if the initial read
    /// already fails) and must not itself perform I/O or retry internally — retries across CAS
    /// conflicts are the caller's responsibility (see `otpgate_core::retry_bounded`).
    async fn update(
        &self,
        id: SessionId,
        now: Timestamp,
        mutator: &(dyn Fn(&SessionRecord) -> SessionRecord + Send + Sync),
    ) -> Result<SessionRecord, StoreError>;
}

pub mod in_memory {
    //! The in-memory [`SessionStore`](super::SessionStore) implementation: a `HashMap` guarded
    //! by a `parking_lot::Mutex`, with a background sweeper evicting expired entries.

    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use otpgate_types::session::Timestamp;
    use otpgate_types::{SessionId, SessionRecord};
    use parking_lot::Mutex;

    use super::{SessionStore, StoreError};
    use crate::metrics::{METRICS_ID_SESSIONS_EXPIRED, METRICS_ID_SESSIONS_OPEN};

    /// An in-memory [`SessionStore`], suitable for the `dev` environment and for unit tests.
    #[derive(Clone)]
    pub struct InMemorySessionStore {
        records: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
    }

    impl Default for InMemorySessionStore {
        fn default() -> Self {
            Self {
                records: Arc::new(Mutex::new(HashMap::new())),
            }
        }
    }

    impl InMemorySessionStore {
        /// Builds an empty store.
        pub fn new() -> Self {
            Self::default()
        }

        /// Spawns a background task that periodically evicts sessions expired as of the
        /// system clock, decrementing the open-sessions gauge for each one removed.
        ///
        /// The returned `JoinHandle` is owned by the caller; dropping it does not stop the
        /// sweeper (use `JoinHandle::abort` to stop it explicitly).
        pub fn spawn_sweeper(&self, sweep_interval: Duration) -> tokio::task::JoinHandle<()> {
            let records = Arc::clone(&self.records);
            tokio::task::spawn(async move {
                let mut interval = tokio::time::interval(sweep_interval);
                loop {
                    interval.tick().await;
                    let now = Timestamp::now();
                    let mut guard = records.lock();
                    let before = guard.len();
                    guard.retain(|_, record| !record.is_expired_at(now));
                    let evicted = before - guard.len();
                    if evicted > 0 {
                        metrics::counter!(METRICS_ID_SESSIONS_EXPIRED).increment(evicted as u64);
                        metrics::gauge!(METRICS_ID_SESSIONS_OPEN).decrement(evicted as f64);
                    }
                }
            })
        }
    }

    #[async_trait]
    impl SessionStore for InMemorySessionStore {
        async fn create(&self, record: SessionRecord) -> Result<(), StoreError> {
            self.records.lock().insert(record.session_id, record);
            metrics::gauge!(METRICS_ID_SESSIONS_OPEN).increment(1);
            Ok(())
        }

        async fn get(&self, id: SessionId, now: Timestamp) -> Result<SessionRecord, StoreError> {
            let guard = self.records.lock();
            let record = guard.get(&id).ok_or(StoreError::NotFound)?;
            if record.is_expired_at(now) {
                return Err(StoreError::NotFound);
            }
            Ok(record.clone())
        }

        async fn update(
            &self,
            id: SessionId,
            now: Timestamp,
            mutator: &(dyn Fn(&SessionRecord) -> SessionRecord + Send + Sync),
        ) -> Result<SessionRecord, StoreError> {
            // Held across the whole read-modify-write, so no other writer can interleave and
            // StoreError::Conflict never actually occurs here; the Postgres implementation
            // below is where a real CAS race can surface.
            let mut guard = self.records.lock();
            let current = guard.get(&id).ok_or(StoreError::NotFound)?;
            if current.is_expired_at(now) {
                return Err(StoreError::NotFound);
            }
            let next = mutator(current);
            guard.insert(id, next.clone());
            Ok(next)
        }
    }

    #[cfg(test)]
    mod tests {
        use std::time::Duration;

        use otpgate_types::{PhoneNumber, SessionId};

        use super::*;

        fn sample() -> SessionRecord {
            SessionRecord::new(
                SessionId::generate(),
                PhoneNumber::from_e164_u64(15555550100).unwrap(),
                Duration::from_secs(300),
            )
        }

        #[tokio::test]
        async fn create_then_get_round_trips() {
            let store = InMemorySessionStore::new();
            let record = sample();
            let id = record.session_id;
            store.create(record.clone()).await.unwrap();
            let fetched = store.get(id, Timestamp::now()).await.unwrap();
            assert_eq!(fetched, record);
        }

        #[tokio::test]
        async fn get_of_unknown_id_is_not_found() {
            let store = InMemorySessionStore::new();
            let err = store.get(SessionId::generate(), Timestamp::now()).await;
            assert!(matches!(err, Err(StoreError::NotFound)));
        }

        #[tokio::test]
        async fn get_past_expiry_is_not_found() {
            let store = InMemorySessionStore::new();
            let record = sample();
            let id = record.session_id;
            let expiry = record.expires_at;
            store.create(record).await.unwrap();
            let err = store.get(id, expiry.plus(Duration::from_secs(1))).await;
            assert!(matches!(err, Err(StoreError::NotFound)));
        }

        #[tokio::test]
        async fn update_applies_mutator_and_bumps_version() {
            let store = InMemorySessionStore::new();
            let record = sample();
            let id = record.session_id;
            store.create(record).await.unwrap();
            let updated = store
                .update(id, Timestamp::now(), &|current| {
                    let mut next = current.clone();
                    next.version += 1;
                    next
                })
                .await
                .unwrap();
            assert_eq!(updated.version, 1);
        }

        #[tokio::test]
        async fn update_of_unknown_id_is_not_found() {
            let store = InMemorySessionStore::new();
            let err = store
                .update(SessionId::generate(), Timestamp::now(), &|current| {
                    current.clone()
                })
                .await;
            assert!(matches!(err, Err(StoreError::NotFound)));
        }
    }
}
