//! Challenge nonce storage
//!
//! At most one live nonce exists per public key. Issuing a new challenge
//! overwrites the previous record, and every verification attempt removes it.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::RwLock;

use crate::db::StoreError;

use super::error::AuthError;

/// Nonce issued to a public key
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct NonceRecord {
    pub nonce: String,
    pub issued_at_millis: i64,
}

impl NonceRecord {
    pub fn new(nonce: impl Into<String>, issued_at_millis: i64) -> Self {
        Self {
            nonce: nonce.into(),
            issued_at_millis,
        }
    }

    /// Whether the record is older than `ttl` at `now_millis`
    pub fn is_expired(&self, now_millis: i64, ttl: Duration) -> bool {
        now_millis - self.issued_at_millis > ttl.as_millis() as i64
    }
}

/// Key-value backend for nonce records
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Store a record, replacing any previous one for the same key
    async fn put(&self, public_key: &str, record: NonceRecord) -> Result<(), StoreError>;

    /// Atomically remove and return the record for a key
    async fn take(&self, public_key: &str) -> Result<Option<NonceRecord>, StoreError>;

    /// Delete every record issued before `cutoff_millis`, returning how many were removed
    async fn purge_issued_before(&self, cutoff_millis: i64) -> Result<u64, StoreError>;
}

/// Process-local nonce store
#[derive(Clone, Default)]
pub struct MemoryNonceStore {
    records: Arc<RwLock<HashMap<String, NonceRecord>>>,
}

impl MemoryNonceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outstanding records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl NonceStore for MemoryNonceStore {
    async fn put(&self, public_key: &str, record: NonceRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(public_key.to_string(), record);
        Ok(())
    }

    async fn take(&self, public_key: &str) -> Result<Option<NonceRecord>, StoreError> {
        Ok(self.records.write().await.remove(public_key))
    }

    async fn purge_issued_before(&self, cutoff_millis: i64) -> Result<u64, StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| record.issued_at_millis >= cutoff_millis);
        Ok((before - records.len()) as u64)
    }
}

/// PostgreSQL-backed nonce store, shared between server instances
#[derive(Clone)]
pub struct PgNonceStore {
    pool: PgPool,
}

impl PgNonceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NonceStore for PgNonceStore {
    async fn put(&self, public_key: &str, record: NonceRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO auth_nonces (public_key, nonce, issued_at_millis)
            VALUES ($1, $2, $3)
            ON CONFLICT (public_key)
            DO UPDATE SET nonce = EXCLUDED.nonce, issued_at_millis = EXCLUDED.issued_at_millis
            "#,
        )
        .bind(public_key)
        .bind(&record.nonce)
        .bind(record.issued_at_millis)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn take(&self, public_key: &str) -> Result<Option<NonceRecord>, StoreError> {
        let record = sqlx::query_as(
            r#"
            DELETE FROM auth_nonces
            WHERE public_key = $1
            RETURNING nonce, issued_at_millis
            "#,
        )
        .bind(public_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn purge_issued_before(&self, cutoff_millis: i64) -> Result<u64, StoreError> {
        let rows_affected = sqlx::query("DELETE FROM auth_nonces WHERE issued_at_millis < $1")
            .bind(cutoff_millis)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

/// Issue/consume semantics with a freshness window on top of a [`NonceStore`]
#[derive(Clone)]
pub struct NonceLedger {
    store: Arc<dyn NonceStore>,
    ttl: Duration,
}

impl NonceLedger {
    pub fn new(store: Arc<dyn NonceStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Record `nonce` as the only valid challenge for `public_key`
    pub async fn issue(&self, public_key: &str, nonce: &str) -> Result<(), AuthError> {
        let record = NonceRecord::new(nonce, Utc::now().timestamp_millis());
        self.store.put(public_key, record).await.map_err(|e| {
            tracing::error!(public_key = %public_key, error = %e, "Failed to store nonce");
            AuthError::MessageGenerationFailed
        })
    }

    /// Remove and return the live nonce for `public_key`
    ///
    /// A missing record, a stale record and an unreachable store all yield
    /// [`AuthError::NonceExpired`].
    pub async fn consume(&self, public_key: &str) -> Result<String, AuthError> {
        let record = match self.store.take(public_key).await {
            Ok(Some(record)) => record,
            Ok(None) => return Err(AuthError::NonceExpired),
            Err(e) => {
                tracing::error!(public_key = %public_key, error = %e, "Failed to load nonce");
                return Err(AuthError::NonceExpired);
            }
        };

        if record.is_expired(Utc::now().timestamp_millis(), self.ttl) {
            tracing::debug!(public_key = %public_key, "Discarded stale nonce");
            return Err(AuthError::NonceExpired);
        }

        Ok(record.nonce)
    }

    /// Drop every record past the freshness window
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        let cutoff = Utc::now().timestamp_millis() - self.ttl.as_millis() as i64;
        self.store.purge_issued_before(cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "Addr1";

    fn ledger() -> (NonceLedger, MemoryNonceStore) {
        let store = MemoryNonceStore::new();
        let ledger = NonceLedger::new(Arc::new(store.clone()), Duration::from_millis(60_000));
        (ledger, store)
    }

    #[tokio::test]
    async fn test_issue_then_consume() {
        let (ledger, store) = ledger();
        ledger.issue(KEY, "n1").await.unwrap();

        assert_eq!(ledger.consume(KEY).await.unwrap(), "n1");
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_consume_is_single_use() {
        let (ledger, _) = ledger();
        ledger.issue(KEY, "n1").await.unwrap();
        ledger.consume(KEY).await.unwrap();

        assert!(matches!(
            ledger.consume(KEY).await,
            Err(AuthError::NonceExpired)
        ));
    }

    #[tokio::test]
    async fn test_reissue_overwrites() {
        let (ledger, store) = ledger();
        ledger.issue(KEY, "n1").await.unwrap();
        ledger.issue(KEY, "n2").await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(ledger.consume(KEY).await.unwrap(), "n2");
    }

    #[tokio::test]
    async fn test_unknown_key() {
        let (ledger, _) = ledger();
        assert!(matches!(
            ledger.consume("nobody").await,
            Err(AuthError::NonceExpired)
        ));
    }

    #[tokio::test]
    async fn test_stale_record_is_rejected_and_removed() {
        let (ledger, store) = ledger();
        let issued = Utc::now().timestamp_millis() - 60_001;
        store.put(KEY, NonceRecord::new("old", issued)).await.unwrap();

        assert!(matches!(
            ledger.consume(KEY).await,
            Err(AuthError::NonceExpired)
        ));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (ledger, store) = ledger();
        let now = Utc::now().timestamp_millis();
        store.put("old", NonceRecord::new("a", now - 120_000)).await.unwrap();
        store.put("fresh", NonceRecord::new("b", now)).await.unwrap();

        assert_eq!(ledger.purge_expired().await.unwrap(), 1);
        assert_eq!(store.len().await, 1);
        assert_eq!(ledger.consume("fresh").await.unwrap(), "b");
    }

    #[test]
    fn test_record_expiry_boundary() {
        let record = NonceRecord::new("n", 1_000);
        let ttl = Duration::from_millis(60_000);
        assert!(!record.is_expired(61_000, ttl));
        assert!(record.is_expired(61_001, ttl));
    }
}
