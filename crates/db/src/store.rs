//! The credential store seam.
//!
//! The session layer only ever talks to `dyn CredentialStore`, so the same
//! login/registration code runs against PostgreSQL in production and against
//! [`MemoryCredentialStore`](crate::MemoryCredentialStore) in tests.
//!
//! Writes to `refresh_token` are last-write-wins: two concurrent logins for
//! the same user race, and whichever update lands last holds the single live
//! refresh token. There is no version column and no compare-and-swap.

use async_trait::async_trait;
use tollgate_core::types::DbId;

use crate::models::user::{NewUser, User, UserProfile};
use crate::repositories::UserRepo;
use crate::DbPool;

/// PostgreSQL SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Errors raised by a credential store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("Duplicate value: {0}")]
    Conflict(String),

    /// Any other database failure.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence contract for user records and their refresh token.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Confirm the backing store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Find the user whose username (case-insensitive) or email matches.
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Find a user by id, secrets included.
    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, StoreError>;

    /// Find a user by id with the password hash and refresh token excluded.
    async fn find_profile_by_id(&self, id: DbId) -> Result<Option<UserProfile>, StoreError>;

    /// Insert a new user. Duplicate username or email yields [`StoreError::Conflict`].
    async fn create(&self, input: NewUser) -> Result<User, StoreError>;

    /// Persist only the refresh token column; `None` ends the session.
    ///
    /// Returns `false` when no user with `id` exists.
    async fn save_refresh_token(
        &self,
        id: DbId,
        refresh_token: Option<&str>,
    ) -> Result<bool, StoreError>;
}

/// [`CredentialStore`] backed by the `users` table.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: DbPool,
}

impl PgCredentialStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_username_or_email(&self.pool, username, email).await?)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_profile_by_id(&self, id: DbId) -> Result<Option<UserProfile>, StoreError> {
        Ok(UserRepo::find_profile_by_id(&self.pool, id).await?)
    }

    async fn create(&self, input: NewUser) -> Result<User, StoreError> {
        UserRepo::create(&self.pool, &input)
            .await
            .map_err(classify_write_error)
    }

    async fn save_refresh_token(
        &self,
        id: DbId,
        refresh_token: Option<&str>,
    ) -> Result<bool, StoreError> {
        Ok(UserRepo::update_refresh_token(&self.pool, id, refresh_token).await?)
    }
}

/// Turn unique-constraint violations into [`StoreError::Conflict`].
fn classify_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            tracing::debug!(%constraint, "Insert rejected by unique constraint");
            return StoreError::Conflict(constraint);
        }
    }
    StoreError::Database(err)
}
