/// Refresh Token Whitelist
///
/// Persistence for live refresh tokens. A record existing is the sole
/// authority for "this refresh token may still be used"; a valid signature
/// alone is never enough.
///
/// - Postgres stores a SHA-256 digest of the token, never the plaintext
/// - `delete_by_token` reports how many rows it removed so the loser of a
///   concurrent rotation can tell it lost
/// - `rotate` deletes before it inserts

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::AppError;

/// One whitelist row
#[derive(Debug, Clone)]
pub struct RefreshRecord {
    pub id: i64,
    pub identity: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait RefreshStore: Send + Sync {
    /// Append a record with `created_at = now`. Duplicate token strings are
    /// not an error.
    async fn save(&self, identity: &str, token: &str) -> Result<(), AppError>;

    /// Whitelist membership
    async fn exists(&self, token: &str) -> Result<bool, AppError>;

    /// Remove at most one record holding `token`. Returns rows removed (0 or 1).
    async fn delete_by_token(&self, token: &str) -> Result<u64, AppError>;

    /// Remove every record of `identity`
    async fn delete_by_identity(&self, identity: &str) -> Result<u64, AppError>;

    /// Remove every record created strictly before `cutoff`
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError>;

    /// Replace `old_token` with `new_token` for `identity`.
    ///
    /// Returns `false` without inserting anything when `old_token` was no
    /// longer present. A failure after the delete leaves the identity with no
    /// live token (forces re-login), never with two.
    async fn rotate(&self, old_token: &str, identity: &str, new_token: &str) -> Result<bool, AppError> {
        if self.delete_by_token(old_token).await? == 0 {
            return Ok(false);
        }
        self.save(identity, new_token).await?;
        Ok(true)
    }
}

/// Hash a token with SHA-256 before it touches the database
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Postgres-backed whitelist (`refresh_tokens` table)
#[derive(Clone)]
pub struct PgRefreshStore {
    pool: PgPool,
}

impl PgRefreshStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshStore for PgRefreshStore {
    async fn save(&self, identity: &str, token: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (identity, token, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(identity)
        .bind(hash_token(token))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn exists(&self, token: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM refresh_tokens WHERE token = $1)",
        )
        .bind(hash_token(token))
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn delete_by_token(&self, token: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE id = (SELECT id FROM refresh_tokens WHERE token = $1 LIMIT 1)
            "#,
        )
        .bind(hash_token(token))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_by_identity(&self, identity: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE identity = $1")
            .bind(identity)
            .execute(&self.pool)
            .await?;

        tracing::info!(identity = %identity, removed = result.rows_affected(), "All refresh tokens revoked for identity");
        Ok(result.rows_affected())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete and insert in one transaction.
    async fn rotate(&self, old_token: &str, identity: &str, new_token: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE id = (SELECT id FROM refresh_tokens WHERE token = $1 LIMIT 1)
            "#,
        )
        .bind(hash_token(old_token))
        .execute(&mut tx)
        .await?
        .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (identity, token, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(identity)
        .bind(hash_token(new_token))
        .bind(Utc::now())
        .execute(&mut tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}

/// Process-local whitelist for tests and single-node development runs
#[derive(Default)]
pub struct InMemoryRefreshStore {
    records: Mutex<Vec<RefreshRecord>>,
    next_id: AtomicI64,
}

impl InMemoryRefreshStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> Result<MutexGuard<'_, Vec<RefreshRecord>>, AppError> {
        self.records
            .lock()
            .map_err(|_| AppError::Internal("refresh store lock poisoned".to_string()))
    }

    /// Insert a record with an explicit creation time
    pub fn insert_at(&self, identity: &str, token: &str, created_at: DateTime<Utc>) -> Result<(), AppError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.records()?.push(RefreshRecord {
            id,
            identity: identity.to_string(),
            token: token.to_string(),
            created_at,
        });
        Ok(())
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.records().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RefreshStore for InMemoryRefreshStore {
    async fn save(&self, identity: &str, token: &str) -> Result<(), AppError> {
        self.insert_at(identity, token, Utc::now())
    }

    async fn exists(&self, token: &str) -> Result<bool, AppError> {
        Ok(self.records()?.iter().any(|r| r.token == token))
    }

    async fn delete_by_token(&self, token: &str) -> Result<u64, AppError> {
        let mut records = self.records()?;
        match records.iter().position(|r| r.token == token) {
            Some(index) => {
                records.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_by_identity(&self, identity: &str) -> Result<u64, AppError> {
        let mut records = self.records()?;
        let before = records.len();
        records.retain(|r| r.identity != identity);
        Ok((before - records.len()) as u64)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let mut records = self.records()?;
        let before = records.len();
        records.retain(|r| r.created_at >= cutoff);
        Ok((before - records.len()) as u64)
    }
}
