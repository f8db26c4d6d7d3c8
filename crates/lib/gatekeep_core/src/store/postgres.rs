//! PostgreSQL record store.
//!
//! Email uniqueness is enforced by the `identities_email_key` constraint;
//! the federated upsert relies on `ON CONFLICT` for atomicity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use super::{IdentityStore, SessionStore, StoreError};
use crate::models::auth::{
    FederatedProfile, Identity, IdentityWithCredential, NewIdentity, Session, SessionFilter,
    SessionPatch,
};
use crate::uuid::session_id;

const IDENTITY_COLUMNS: &str = "id, email, name, picture, created_at, updated_at";
const SESSION_COLUMNS: &str = "id, identity_id, valid, user_agent, created_at, updated_at";

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

#[derive(sqlx::FromRow)]
struct IdentityRow {
    id: Uuid,
    email: String,
    name: String,
    picture: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<IdentityRow> for Identity {
    fn from(row: IdentityRow) -> Self {
        Identity {
            id: row.id,
            email: row.email,
            name: row.name,
            picture: row.picture,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    identity: IdentityRow,
    password_hash: Option<String>,
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    identity_id: Uuid,
    valid: bool,
    user_agent: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: row.id,
            identity_id: row.identity_id,
            valid: row.valid,
            user_agent: row.user_agent,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Postgres-backed implementation of [`SessionStore`] and [`IdentityStore`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(
        &self,
        identity_id: Uuid,
        user_agent: &str,
    ) -> Result<Session, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "INSERT INTO sessions (id, identity_id, user_agent) VALUES ($1, $2, $3) \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(session_id())
        .bind(identity_id)
        .bind(user_agent)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn find_sessions(&self, filter: &SessionFilter) -> Result<Vec<Session>, StoreError> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE ($1::uuid IS NULL OR id = $1) \
               AND ($2::uuid IS NULL OR identity_id = $2) \
               AND ($3::bool IS NULL OR valid = $3) \
             ORDER BY created_at, id"
        ))
        .bind(filter.id)
        .bind(filter.identity_id)
        .bind(filter.valid)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Session::from).collect())
    }

    async fn update_sessions(
        &self,
        filter: &SessionFilter,
        patch: &SessionPatch,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE sessions SET valid = valid AND NOT $4::bool, updated_at = now() \
             WHERE ($1::uuid IS NULL OR id = $1) \
               AND ($2::uuid IS NULL OR identity_id = $2) \
               AND ($3::bool IS NULL OR valid = $3)",
        )
        .bind(filter.id)
        .bind(filter.identity_id)
        .bind(filter.valid)
        .bind(patch.revokes())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn insert_identity(&self, new: NewIdentity) -> Result<Identity, StoreError> {
        let result = sqlx::query_as::<_, IdentityRow>(&format!(
            "INSERT INTO identities (email, name, picture, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING {IDENTITY_COLUMNS}"
        ))
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.picture)
        .bind(&new.password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row.into()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateEmail(new.email))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_identity_by_email(
        &self,
        email: &str,
    ) -> Result<Option<IdentityWithCredential>, StoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {IDENTITY_COLUMNS}, password_hash FROM identities WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| IdentityWithCredential {
            identity: r.identity.into(),
            password_hash: r.password_hash,
        }))
    }

    async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM identities WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Identity::from))
    }

    async fn upsert_federated_identity(
        &self,
        profile: &FederatedProfile,
    ) -> Result<Identity, StoreError> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!(
            "INSERT INTO identities (email, name, picture) VALUES ($1, $2, $3) \
             ON CONFLICT (email) DO UPDATE \
               SET name = EXCLUDED.name, picture = EXCLUDED.picture, updated_at = now() \
             RETURNING {IDENTITY_COLUMNS}"
        ))
        .bind(&profile.email)
        .bind(&profile.name)
        .bind(&profile.picture)
        .fetch_one(&self.pool)
        .await
        .inspect_err(|e| warn!(error = %e, "federated identity upsert failed"))?;
        Ok(row.into())
    }
}
