/// Session Manager
///
/// Owns the refresh-token lifecycle: issue on login, rotate on refresh,
/// delete on logout or account removal. From this side a refresh token is
/// live, rotated, revoked, or expired, and nothing ever moves back to live.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::claims::{Role, TokenKind};
use crate::auth::jwt::TokenCodec;
use crate::auth::refresh_token::RefreshStore;
use crate::error::{AppError, AuthError};

/// A freshly issued access/refresh pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct SessionManager {
    codec: TokenCodec,
    store: Arc<dyn RefreshStore>,
}

impl SessionManager {
    pub fn new(codec: TokenCodec, store: Arc<dyn RefreshStore>) -> Self {
        Self { codec, store }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    fn issue_pair(&self, identity: &str, role: Role) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.codec.issue(identity, role, TokenKind::Access)?,
            refresh_token: self.codec.issue(identity, role, TokenKind::Refresh)?,
        })
    }

    /// Start a session for an already-authenticated identity
    ///
    /// # Errors
    /// Returns a database error if the refresh token cannot be whitelisted
    pub async fn login(&self, identity: &str, role: Role) -> Result<TokenPair, AppError> {
        let pair = self.issue_pair(identity, role)?;
        self.store.save(identity, &pair.refresh_token).await?;

        tracing::info!(identity = %identity, role = %role, "Session started");
        Ok(pair)
    }

    /// Exchange a live refresh token for a new pair (token rotation)
    ///
    /// The presented token must verify as a refresh token AND still be on the
    /// whitelist. Its record is removed before the new one is written, so a
    /// second use of the same token, sequential or concurrent, is rejected.
    ///
    /// # Errors
    /// - `AuthError::InvalidToken`: bad signature, wrong kind, or expired
    /// - `AuthError::TokenNotWhitelisted`: already rotated or revoked
    /// - database error: store unavailable
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let subject = self.codec.verify(refresh_token, TokenKind::Refresh)?;

        if !self.store.exists(refresh_token).await? {
            tracing::warn!(identity = %subject.identity, "Refresh token presented after rotation or revocation");
            return Err(AuthError::TokenNotWhitelisted.into());
        }

        let pair = self.issue_pair(&subject.identity, subject.role)?;

        if !self
            .store
            .rotate(refresh_token, &subject.identity, &pair.refresh_token)
            .await?
        {
            tracing::warn!(identity = %subject.identity, "Refresh token consumed by a concurrent rotation");
            return Err(AuthError::TokenNotWhitelisted.into());
        }

        tracing::info!(identity = %subject.identity, "Refresh token rotated");
        Ok(pair)
    }

    /// Revoke one refresh token (logout)
    ///
    /// A token that fails verification is ignored so the caller learns
    /// nothing about it. A verified token's record is deleted whether or not
    /// it is still present.
    ///
    /// # Errors
    /// Returns a database error only if the store fails
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AppError> {
        let subject = match self.codec.verify(refresh_token, TokenKind::Refresh) {
            Ok(subject) => subject,
            Err(_) => {
                tracing::debug!("Ignoring revoke of an unverifiable token");
                return Ok(());
            }
        };

        let removed = self.store.delete_by_token(refresh_token).await?;
        tracing::info!(identity = %subject.identity, removed, "Refresh token revoked");
        Ok(())
    }

    /// Revoke every refresh token of an identity (account deletion, log out
    /// everywhere). Returns how many records were removed.
    pub async fn revoke_all_for_identity(&self, identity: &str) -> Result<u64, AppError> {
        let removed = self.store.delete_by_identity(identity).await?;
        tracing::info!(identity = %identity, removed, "All sessions revoked");
        Ok(removed)
    }
}
