//! Record store adapters.
//!
//! The core treats persistence as a key-addressed record store. The traits
//! here are the only seam: [`postgres::PgStore`] backs production and
//! [`memory::MemoryStore`] backs tests and local development.
//!
//! Concurrency safety is pushed to the store: email uniqueness and
//! per-session updates must be atomic there. Nothing above this layer takes
//! a lock shared across requests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::auth::{
    FederatedProfile, Identity, IdentityWithCredential, NewIdentity, Session, SessionFilter,
    SessionPatch,
};

/// Typed store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached (connection error, pool timeout, I/O).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// An identity with this email already exists.
    #[error("Duplicate email: {0}")]
    DuplicateEmail(String),
}

/// Session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new valid session. The returned record has been persisted.
    async fn create_session(
        &self,
        identity_id: Uuid,
        user_agent: &str,
    ) -> Result<Session, StoreError>;

    /// Return all sessions matching `filter`, oldest first. No match is an
    /// empty list, not an error.
    async fn find_sessions(&self, filter: &SessionFilter) -> Result<Vec<Session>, StoreError>;

    /// Apply `patch` to all matching sessions and touch `updated_at`.
    ///
    /// Returns the number of matched sessions. Re-applying a patch that is
    /// already in effect is a successful no-op.
    async fn update_sessions(
        &self,
        filter: &SessionFilter,
        patch: &SessionPatch,
    ) -> Result<u64, StoreError>;

    /// Look up a single session by ID.
    async fn find_session(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        Ok(self
            .find_sessions(&SessionFilter::by_id(id))
            .await?
            .into_iter()
            .next())
    }
}

/// Identity persistence. Email is unique.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Insert a new identity. Fails with [`StoreError::DuplicateEmail`] when
    /// the email is taken.
    async fn insert_identity(&self, new: NewIdentity) -> Result<Identity, StoreError>;

    /// Fetch an identity together with its password hash.
    async fn find_identity_by_email(
        &self,
        email: &str,
    ) -> Result<Option<IdentityWithCredential>, StoreError>;

    /// Fetch an identity by ID.
    async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>, StoreError>;

    /// Create the identity for `profile.email` if absent, else update its
    /// name and picture. Atomic per email: concurrent first logins yield one
    /// identity.
    async fn upsert_federated_identity(
        &self,
        profile: &FederatedProfile,
    ) -> Result<Identity, StoreError>;
}
