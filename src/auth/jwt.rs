/// Token Codec
///
/// Issues and verifies signed session tokens. Stateless and free of I/O:
/// the only inputs are the signing key, the clock, and the token itself.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::{Claims, Role, TokenKind};
use crate::auth::identity::AuthenticatedIdentity;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, ConfigError};

/// HS256 keys shorter than this are refused at startup.
pub const MIN_SECRET_LENGTH: usize = 32;

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    access_ttl: i64,
    refresh_ttl: i64,
}

impl TokenCodec {
    /// Build a codec from configuration
    ///
    /// # Errors
    /// Returns a config error if the secret is too short or a TTL is not positive
    pub fn new(config: &JwtSettings) -> Result<Self, AppError> {
        if config.secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::InvalidValue(format!(
                "jwt.secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            ))
            .into());
        }
        if config.access_token_expiry <= 0 || config.refresh_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue("jwt token expiry must be positive".to_string()).into());
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss"]);
        // Expiry is checked by hand below with a strict comparison and no leeway.
        validation.validate_exp = false;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            issuer: config.issuer.clone(),
            access_ttl: config.access_token_expiry,
            refresh_ttl: config.refresh_token_expiry,
        })
    }

    /// Lifetime in seconds of a freshly issued token of `kind`
    pub fn ttl(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    /// Issue a token for `subject` valid from now
    pub fn issue(&self, subject: &str, role: Role, kind: TokenKind) -> Result<String, AppError> {
        self.issue_at(subject, role, kind, Utc::now())
    }

    /// Issue a token as if the wall clock read `now`
    pub fn issue_at(
        &self,
        subject: &str,
        role: Role,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = Claims::new(subject, role, kind, self.ttl(kind), &self.issuer, now);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Verify a token against the current time
    ///
    /// # Errors
    /// Returns `AuthError::InvalidToken` for every failure; the specific cause
    /// is only logged.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<AuthenticatedIdentity, AuthError> {
        self.verify_at(token, expected, Utc::now())
    }

    pub fn verify_at(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedIdentity, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let cause = match e.kind() {
                    ErrorKind::InvalidSignature => "bad_signature",
                    ErrorKind::InvalidIssuer => "wrong_issuer",
                    ErrorKind::MissingRequiredClaim(_) => "missing_claim",
                    _ => "malformed",
                };
                tracing::debug!(cause, expected = %expected, "Token verification failed: {}", e);
                AuthError::InvalidToken
            })?;

        if claims.typ != expected {
            tracing::debug!(
                cause = "wrong_kind",
                expected = %expected,
                actual = %claims.typ,
                "Token verification failed"
            );
            return Err(AuthError::InvalidToken);
        }

        if claims.is_expired_at(now) {
            tracing::debug!(cause = "expired", expected = %expected, exp = claims.exp, "Token verification failed");
            return Err(AuthError::InvalidToken);
        }

        Ok(AuthenticatedIdentity {
            identity: claims.sub,
            role: claims.role,
        })
    }
}
