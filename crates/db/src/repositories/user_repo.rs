//! Repository for the `users` table.

use sqlx::PgPool;
use tollgate_core::types::DbId;

use crate::models::user::{NewUser, User, UserProfile};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, username, email, full_name, avatar_url, cover_image_url, \
                        password_hash, refresh_token, created_at, updated_at";

/// Columns safe to hand back to callers: no password hash, no refresh token.
const PROFILE_COLUMNS: &str = "id, username, email, full_name, avatar_url, cover_image_url, \
                                created_at, updated_at";

/// Provides the queries the credential store needs.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &NewUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (username, email, full_name, avatar_url, cover_image_url, password_hash)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.full_name)
            .bind(&input.avatar_url)
            .bind(&input.cover_image_url)
            .bind(&input.password_hash)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by internal ID, selecting only the profile columns.
    pub async fn find_profile_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<UserProfile>, sqlx::Error> {
        let query = format!("SELECT {PROFILE_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserProfile>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the user matching `username` (case-insensitive) or `email`.
    ///
    /// If the two identifiers belong to different accounts the oldest row wins.
    pub async fn find_by_username_or_email(
        pool: &PgPool,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE username = LOWER($1) OR email = $2
             ORDER BY id
             LIMIT 1"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Overwrite the stored refresh token (or clear it with `None`).
    ///
    /// Touches no other column, so nothing else on the row is re-validated.
    /// Returns `true` if the row was updated.
    pub async fn update_refresh_token(
        pool: &PgPool,
        id: DbId,
        refresh_token: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET refresh_token = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(refresh_token)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
