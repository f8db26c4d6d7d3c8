//! In-memory record store.
//!
//! Backs tests and local development. Email uniqueness is enforced through
//! the `emails` index: every identity write goes through its entry API, which
//! holds the shard lock for that email for the duration of the write.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::{IdentityStore, SessionStore, StoreError};
use crate::models::auth::{
    FederatedProfile, Identity, IdentityWithCredential, NewIdentity, Session, SessionFilter,
    SessionPatch,
};
use crate::uuid::{identity_id, session_id};

/// Stored identity row.
#[derive(Debug, Clone)]
struct IdentityRow {
    identity: Identity,
    password_hash: Option<String>,
}

/// In-memory implementation of [`SessionStore`] and [`IdentityStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    identities: DashMap<Uuid, IdentityRow>,
    /// Unique index: email → identity ID.
    emails: DashMap<String, Uuid>,
    sessions: DashMap<Uuid, Session>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable store: every call fails with
    /// [`StoreError::Unavailable`] while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stored identities.
    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }

    /// Number of stored sessions, valid or not.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(
        &self,
        identity_id: Uuid,
        user_agent: &str,
    ) -> Result<Session, StoreError> {
        self.check_online()?;
        let now = Utc::now();
        let session = Session {
            id: session_id(),
            identity_id,
            valid: true,
            user_agent: user_agent.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_sessions(&self, filter: &SessionFilter) -> Result<Vec<Session>, StoreError> {
        self.check_online()?;
        let mut found: Vec<Session> = self
            .sessions
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|s| (s.created_at, s.id));
        Ok(found)
    }

    async fn update_sessions(
        &self,
        filter: &SessionFilter,
        patch: &SessionPatch,
    ) -> Result<u64, StoreError> {
        self.check_online()?;
        let now = Utc::now();
        let mut matched = 0;
        for mut entry in self.sessions.iter_mut() {
            let session = entry.value_mut();
            if !filter.matches(session) {
                continue;
            }
            if patch.revokes() {
                session.valid = false;
            }
            session.updated_at = now;
            matched += 1;
        }
        Ok(matched)
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn insert_identity(&self, new: NewIdentity) -> Result<Identity, StoreError> {
        self.check_online()?;
        match self.emails.entry(new.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateEmail(new.email)),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let identity = Identity {
                    id: identity_id(),
                    email: new.email,
                    name: new.name,
                    picture: new.picture,
                    created_at: now,
                    updated_at: now,
                };
                self.identities.insert(
                    identity.id,
                    IdentityRow {
                        identity: identity.clone(),
                        password_hash: new.password_hash,
                    },
                );
                slot.insert(identity.id);
                Ok(identity)
            }
        }
    }

    async fn find_identity_by_email(
        &self,
        email: &str,
    ) -> Result<Option<IdentityWithCredential>, StoreError> {
        self.check_online()?;
        let Some(id) = self.emails.get(email).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self.identities.get(&id).map(|row| IdentityWithCredential {
            identity: row.identity.clone(),
            password_hash: row.password_hash.clone(),
        }))
    }

    async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        self.check_online()?;
        Ok(self.identities.get(&id).map(|row| row.identity.clone()))
    }

    async fn upsert_federated_identity(
        &self,
        profile: &FederatedProfile,
    ) -> Result<Identity, StoreError> {
        self.check_online()?;
        let now = Utc::now();
        match self.emails.entry(profile.email.clone()) {
            Entry::Occupied(slot) => {
                let id = *slot.get();
                let mut row = self
                    .identities
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::Unavailable(format!("dangling email index for {id}")))?;
                row.identity.name = profile.name.clone();
                row.identity.picture = profile.picture.clone();
                row.identity.updated_at = now;
                Ok(row.identity.clone())
            }
            Entry::Vacant(slot) => {
                let identity = Identity {
                    id: identity_id(),
                    email: profile.email.clone(),
                    name: profile.name.clone(),
                    picture: profile.picture.clone(),
                    created_at: now,
                    updated_at: now,
                };
                self.identities.insert(
                    identity.id,
                    IdentityRow {
                        identity: identity.clone(),
                        password_hash: None,
                    },
                );
                slot.insert(identity.id);
                Ok(identity)
            }
        }
    }
}
