/// Identity lookup
///
/// The account service owns identities; the session core only reads the
/// login identifier, role, and password hash of one identity at a time.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::auth::claims::Role;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub identity: String,
    pub role: Role,
    pub password_hash: String,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_identity(&self, identity: &str) -> Result<Option<UserRecord>, AppError>;
}

/// Reads the `users` table
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_identity(&self, identity: &str) -> Result<Option<UserRecord>, AppError> {
        let row = sqlx::query_as::<_, (String, String, String)>(
            "SELECT email, role, password_hash FROM users WHERE email = $1",
        )
        .bind(identity)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(identity, role, password_hash)| {
            let role = role.parse::<Role>().map_err(|_| {
                AppError::Internal(format!("Unknown role '{}' stored for identity", role))
            })?;
            Ok(UserRecord {
                identity,
                role,
                password_hash,
            })
        })
        .transpose()
    }
}

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: UserRecord) -> Result<(), AppError> {
        self.users
            .write()
            .map_err(|_| AppError::Internal("user directory lock poisoned".to_string()))?
            .insert(record.identity.clone(), record);
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_identity(&self, identity: &str) -> Result<Option<UserRecord>, AppError> {
        let users = self
            .users
            .read()
            .map_err(|_| AppError::Internal("user directory lock poisoned".to_string()))?;
        Ok(users.get(identity).cloned())
    }
}
