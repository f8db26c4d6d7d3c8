//! Password accounts: registration and credential checks.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::AuthError;
use super::password::CredentialVerifier;
use crate::models::auth::{Identity, NewIdentity};
use crate::store::IdentityStore;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Registration input with the plain password.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub password: String,
    pub password_confirmation: String,
}

impl Registration {
    /// Minimal shape checks; full schema validation belongs to the transport.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.name.trim().is_empty() {
            return Err(AuthError::Validation("Name is required".into()));
        }
        if !self.email.contains('@') {
            return Err(AuthError::Validation("Not a valid email".into()));
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "Password too short - should be {MIN_PASSWORD_LEN} chars minimum"
            )));
        }
        if self.password != self.password_confirmation {
            return Err(AuthError::Validation("Passwords do not match".into()));
        }
        Ok(())
    }
}

/// Password checked against [`AccountService`]'s decoy hash.
const DECOY_PASSWORD: &str = "decoy-password-never-issued";

/// Creates identities and checks their passwords.
pub struct AccountService {
    identities: Arc<dyn IdentityStore>,
    verifier: Arc<dyn CredentialVerifier>,
    /// Hash checked when there is no real one, so unknown emails cost the
    /// same as wrong passwords.
    decoy_hash: Option<String>,
}

impl AccountService {
    pub fn new(identities: Arc<dyn IdentityStore>, verifier: Arc<dyn CredentialVerifier>) -> Self {
        let decoy_hash = match verifier.prepare(DECOY_PASSWORD) {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!(error = %e, "could not prepare decoy password hash");
                None
            }
        };
        Self {
            identities,
            verifier,
            decoy_hash,
        }
    }

    /// Burn one credential check against the decoy hash.
    fn check_decoy(&self, password: &str) {
        if let Some(hash) = &self.decoy_hash {
            let _ = self.verifier.check(password, hash);
        }
    }

    /// Register a new identity. The password is hashed before the record is
    /// inserted; a taken email yields [`AuthError::EmailTaken`].
    pub async fn register(&self, registration: Registration) -> Result<Identity, AuthError> {
        registration.validate()?;

        let password_hash = self.verifier.prepare(&registration.password)?;
        let identity = self
            .identities
            .insert_identity(NewIdentity {
                email: registration.email,
                name: registration.name,
                picture: None,
                password_hash: Some(password_hash),
            })
            .await?;

        info!(identity_id = %identity.id, "identity registered");
        Ok(identity)
    }

    /// Check an email/password pair. Unknown email, federated-only identity
    /// and wrong password are all [`AuthError::InvalidCredentials`].
    pub async fn verify_password(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let Some(found) = self.identities.find_identity_by_email(email).await? else {
            debug!("login for unknown email");
            self.check_decoy(password);
            return Err(AuthError::InvalidCredentials);
        };

        let Some(hash) = found.password_hash.as_deref() else {
            debug!(identity_id = %found.identity.id, "login for identity without password");
            self.check_decoy(password);
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verifier.check(password, hash) {
            debug!(identity_id = %found.identity.id, "wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(found.identity)
    }
}
