//! A Postgres-backed [`SessionStore`], keyed by `session_id` with `version`-guarded updates.
//!
//! Row-level expiry is enforced by re-checking `expires_at > now()` in every read/write query
//! rather than relying on a background deletion job, so correctness does not depend on a
//! vacuum-style sweep running promptly.

use async_trait::async_trait;
use eyre::Context as _;
use otpgate_types::session::{CheckAttempt, SendAttempt, Timestamp};
use otpgate_types::{PhoneNumber, SessionId, SessionRecord};
use secrecy::{ExposeSecret as _, SecretString};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::instrument;

use super::{SessionStore, StoreError};

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    session_id: uuid::Uuid,
    phone_number: i64,
    created_at: i64,
    expires_at: i64,
    sender_name: Option<String>,
    sender_data: Option<Vec<u8>>,
    verified_code: Option<String>,
    send_attempts: serde_json::Value,
    check_attempts: serde_json::Value,
    version: i64,
}

impl TryFrom<SessionRow> for SessionRecord {
    type Error = eyre::Error;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(SessionRecord {
            session_id: SessionId::from_uuid(row.session_id),
            phone_number: PhoneNumber::from_e164_u64(row.phone_number as u64)
                .context("phone number stored in DB is not valid E.164")?,
            created_at: Timestamp::from_millis_since_epoch(row.created_at as u64),
            expires_at: Timestamp::from_millis_since_epoch(row.expires_at as u64),
            sender_name: row.sender_name,
            sender_data: row.sender_data,
            verified_code: row.verified_code,
            send_attempts: serde_json::from_value::<Vec<SendAttempt>>(row.send_attempts)
                .context("corrupt send_attempts column")?,
            check_attempts: serde_json::from_value::<Vec<CheckAttempt>>(row.check_attempts)
                .context("corrupt check_attempts column")?,
            version: row.version as u64,
        })
    }
}

/// A [`SessionStore`] backed by a single `sessions` table in Postgres.
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    /// Connects to `connection_string`, pooling up to `max_connections`, and ensures the
    /// `sessions` table exists.
    #[instrument(level = "info", skip_all)]
    pub async fn init(connection_string: &SecretString, max_connections: u32) -> eyre::Result<Self> {
        tracing::info!("connecting to session store DB...");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(connection_string.expose_secret())
            .await
            .context("while connecting to session store postgres DB")?;

        sqlx::query(
            r#"
                CREATE TABLE IF NOT EXISTS sessions (
                    session_id UUID PRIMARY KEY,
                    phone_number BIGINT NOT NULL,
                    created_at BIGINT NOT NULL,
                    expires_at BIGINT NOT NULL,
                    sender_name TEXT,
                    sender_data BYTEA,
                    verified_code TEXT,
                    send_attempts JSONB NOT NULL DEFAULT '[]',
                    check_attempts JSONB NOT NULL DEFAULT '[]',
                    version BIGINT NOT NULL
                )
            "#,
        )
        .execute(&pool)
        .await
        .context("while ensuring sessions table exists")?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    #[instrument(level = "debug", skip_all, fields(session_id = %record.session_id))]
    async fn create(&self, record: SessionRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
                INSERT INTO sessions
                    (session_id, phone_number, created_at, expires_at, sender_name,
                     sender_data, verified_code, send_attempts, check_attempts, version)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.session_id.into_inner())
        .bind(record.phone_number.to_e164_u64() as i64)
        .bind(record.created_at.as_millis_since_epoch() as i64)
        .bind(record.expires_at.as_millis_since_epoch() as i64)
        .bind(&record.sender_name)
        .bind(&record.sender_data)
        .bind(&record.verified_code)
        .bind(serde_json::to_value(&record.send_attempts).expect("serializable"))
        .bind(serde_json::to_value(&record.check_attempts).expect("serializable"))
        .bind(record.version as i64)
        .execute(&self.pool)
        .await
        .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(session_id = %id))]
    async fn get(&self, id: SessionId, now: Timestamp) -> Result<SessionRecord, StoreError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
                SELECT session_id, phone_number, created_at, expires_at, sender_name,
                       sender_data, verified_code, send_attempts, check_attempts, version
                FROM sessions
                WHERE session_id = $1 AND expires_at > $2
            "#,
        )
        .bind(id.into_inner())
        .bind(now.as_millis_since_epoch() as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        match row {
            Some(row) => row
                .try_into()
                .map_err(|err: eyre::Error| StoreError::Unavailable(err.to_string())),
            None => Err(StoreError::NotFound),
        }
    }

    #[instrument(level = "debug", skip_all, fields(session_id = %id))]
    async fn update(
        &self,
        id: SessionId,
        now: Timestamp,
        mutator: &(dyn Fn(&SessionRecord) -> SessionRecord + Send + Sync),
    ) -> Result<SessionRecord, StoreError> {
        let current = self.get(id, now).await?;
        let next = mutator(&current);

        let result = sqlx::query(
            r#"
                UPDATE sessions
                SET expires_at = $1, sender_name = $2, sender_data = $3, verified_code = $4,
                    send_attempts = $5, check_attempts = $6, version = $7
                WHERE session_id = $8 AND version = $9 AND expires_at > $10
            "#,
        )
        .bind(next.expires_at.as_millis_since_epoch() as i64)
        .bind(&next.sender_name)
        .bind(&next.sender_data)
        .bind(&next.verified_code)
        .bind(serde_json::to_value(&next.send_attempts).expect("serializable"))
        .bind(serde_json::to_value(&next.check_attempts).expect("serializable"))
        .bind(next.version as i64)
        .bind(id.into_inner())
        .bind(current.version as i64)
        .bind(now.as_millis_since_epoch() as i64)
        .execute(&self.pool)
        .await
        .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict);
        }
        Ok(next)
    }
}
