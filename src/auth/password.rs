/// Password verification for local login
///
/// The one-way hash is bcrypt; accounts are created elsewhere, this side only
/// ever checks a presented password against a stored hash.

use bcrypt::{hash, verify, DEFAULT_COST};
use std::sync::OnceLock;

use crate::error::AppError;

/// Stand-in hash for identities that do not exist, built once at the cost
/// stored hashes are expected to use.
static PLACEHOLDER_HASH: OnceLock<String> = OnceLock::new();

/// Hash a password with bcrypt at `cost`
///
/// # Errors
/// Returns error if bcrypt rejects the cost or input
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost).map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its bcrypt hash
///
/// # Errors
/// Returns error if the stored hash is not a valid bcrypt string
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

fn placeholder_hash() -> Result<&'static str, AppError> {
    if let Some(existing) = PLACEHOLDER_HASH.get() {
        return Ok(existing.as_str());
    }
    let fresh = hash_password("placeholder-for-unknown-identity", DEFAULT_COST)?;
    Ok(PLACEHOLDER_HASH.get_or_init(|| fresh).as_str())
}

/// Spend the same bcrypt work a real check would when the identity has no
/// stored hash, so an unknown login takes as long as a wrong password.
///
/// # Errors
/// Returns error only if the placeholder hash cannot be built
pub fn verify_password_without_account(password: &str) -> Result<(), AppError> {
    verify_password(password, placeholder_hash()?)?;
    Ok(())
}
