//! Password hashing via bcrypt.

use tracing::error;

use super::AuthError;

/// Default bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Opaque credential capability: prepares a stored hash from a plain
/// password and checks a candidate against it.
pub trait CredentialVerifier: Send + Sync {
    /// Hash `password` for storage. Called explicitly by the identity
    /// creation path before the record is persisted.
    fn prepare(&self, password: &str) -> Result<String, AuthError>;

    /// Check `password` against `stored_hash`. Malformed hashes yield `false`.
    fn check(&self, password: &str, stored_hash: &str) -> bool;
}

/// bcrypt-backed [`CredentialVerifier`].
#[derive(Debug, Clone, Copy)]
pub struct Bcrypt {
    cost: u32,
}

impl Bcrypt {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for Bcrypt {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

impl CredentialVerifier for Bcrypt {
    fn prepare(&self, password: &str) -> Result<String, AuthError> {
        hash_password(password, self.cost)
    }

    fn check(&self, password: &str, stored_hash: &str) -> bool {
        verify_password(password, stored_hash).unwrap_or_else(|e| {
            error!(error = %e, "password verification failed");
            false
        })
    }
}

/// Hash a password with bcrypt.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost).map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
}
