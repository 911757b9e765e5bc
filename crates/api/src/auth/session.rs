//! Registration, login and the refresh-token lifecycle.
//!
//! A user's session state lives entirely in the `refresh_token` column:
//!
//! ```text
//! NO_SESSION   --login-->   ACTIVE(T1)
//! ACTIVE(T1)   --login-->   ACTIVE(T2)      T1 no longer matches, so it is dead
//! ACTIVE(T1)   --refresh--> ACTIVE(T2)      only while T1 still matches
//! ACTIVE(_)    --logout-->  NO_SESSION
//! ```
//!
//! Expiry never mutates the store; it is enforced by the `exp` claim when a
//! token is verified. Concurrent logins for one user are last-write-wins.
//!
//! Every operation returns [`CoreError`]. Store, hashing and signing failures
//! are logged here and collapsed into a generic [`CoreError::Internal`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tollgate_core::credentials::{LoginFields, RegisterFields};
use tollgate_core::error::CoreError;
use tollgate_core::types::DbId;
use tollgate_db::models::user::{NewUser, UserProfile};
use tollgate_db::{CredentialStore, StoreError};

use crate::assets::AssetUploader;
use crate::auth::jwt::{TokenIssuer, TokenPair};
use crate::auth::password::{hash_password, verify_password};

const TOKEN_GENERATION_FAILED: &str =
    "Something went wrong while generating refresh and access token";
const REGISTRATION_FAILED: &str = "Something went wrong while registering the user";
const LOGIN_FAILED: &str = "Something went wrong while logging in";
const STORE_UNAVAILABLE: &str = "Something went wrong, please try again later";

/// Registration input: text fields plus paths of the staged image files.
#[derive(Debug, Default)]
pub struct RegisterInput {
    pub fields: RegisterFields,
    /// Required. `None` when the request carried no avatar file.
    pub avatar: Option<PathBuf>,
    /// Optional; a missing or failed cover image degrades to `""`.
    pub cover_image: Option<PathBuf>,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: UserProfile,
    pub tokens: TokenPair,
}

/// Why token generation failed. Never shown to callers.
#[derive(Debug, thiserror::Error)]
enum TokenGenerationError {
    #[error("user {0} no longer exists")]
    UserVanished(DbId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Orchestrates the credential store, asset uploader and token issuer.
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    uploader: Arc<dyn AssetUploader>,
    issuer: TokenIssuer,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        uploader: Arc<dyn AssetUploader>,
        issuer: TokenIssuer,
    ) -> Self {
        Self {
            store,
            uploader,
            issuer,
        }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Whether the credential store answers. Failures are logged, not returned.
    pub async fn store_healthy(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Credential store health check failed");
                false
            }
        }
    }

    /// Create an account and return it with secrets excluded.
    ///
    /// Nothing is written to the store unless every check passes.
    pub async fn register_user(&self, input: RegisterInput) -> Result<UserProfile, CoreError> {
        let RegisterFields {
            full_name,
            email,
            username,
            password,
        } = input.fields.normalize()?;

        let existing = self
            .store
            .find_by_username_or_email(&username, &email)
            .await
            .map_err(|e| store_failure(e, STORE_UNAVAILABLE))?;
        if existing.is_some() {
            return Err(duplicate_identity());
        }

        let avatar_path = input
            .avatar
            .ok_or_else(|| CoreError::Validation("Avatar file is required".into()))?;
        let avatar = self
            .upload(&avatar_path)
            .await
            .ok_or_else(|| CoreError::Validation("Avatar file is required".into()))?;

        let cover_image_url = match input.cover_image {
            Some(path) => self.upload(&path).await.unwrap_or_default(),
            None => String::new(),
        };

        let password_hash = blocking(move || hash_password(&password))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Password hashing failed");
                CoreError::Internal(REGISTRATION_FAILED.into())
            })?;

        let created = self
            .store
            .create(NewUser {
                username,
                email,
                full_name,
                avatar_url: avatar,
                cover_image_url,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration.
                StoreError::Conflict(_) => duplicate_identity(),
                other => store_failure(other, REGISTRATION_FAILED),
            })?;

        let profile = self
            .store
            .find_profile_by_id(created.id)
            .await
            .map_err(|e| store_failure(e, REGISTRATION_FAILED))?
            .ok_or_else(|| {
                tracing::error!(user_id = created.id, "User vanished right after creation");
                CoreError::Internal(REGISTRATION_FAILED.into())
            })?;

        tracing::info!(user_id = profile.id, username = %profile.username, "User registered");
        Ok(profile)
    }

    /// Verify credentials and start a new session, replacing any previous one.
    pub async fn login_user(&self, credentials: LoginFields) -> Result<LoginOutcome, CoreError> {
        let credentials = credentials.normalize()?;

        let user = self
            .store
            .find_by_username_or_email(&credentials.username, &credentials.email)
            .await
            .map_err(|e| store_failure(e, STORE_UNAVAILABLE))?
            .ok_or_else(|| CoreError::NotFound("User does not exist".into()))?;

        let password = credentials.password;
        let password_hash = user.password_hash.clone();
        let password_valid = blocking(move || verify_password(&password, &password_hash))
            .await
            .map_err(|e| {
                tracing::error!(user_id = user.id, error = %e, "Password verification failed");
                CoreError::Internal(LOGIN_FAILED.into())
            })?;

        if !password_valid {
            tracing::info!(user_id = user.id, "Rejected login with wrong password");
            return Err(CoreError::Unauthorized("Invalid user credentials".into()));
        }

        let tokens = self.generate_access_and_refresh_tokens(user.id).await?;

        let profile = self
            .store
            .find_profile_by_id(user.id)
            .await
            .map_err(|e| store_failure(e, LOGIN_FAILED))?
            .ok_or_else(|| {
                tracing::error!(user_id = user.id, "User vanished during login");
                CoreError::Internal(LOGIN_FAILED.into())
            })?;

        tracing::info!(user_id = profile.id, "User logged in");
        Ok(LoginOutcome {
            user: profile,
            tokens,
        })
    }

    /// Load the user, mint both tokens and persist the refresh token.
    ///
    /// Only the refresh token column is written. Any failure comes back as the
    /// same generic [`CoreError::Internal`].
    pub async fn generate_access_and_refresh_tokens(
        &self,
        user_id: DbId,
    ) -> Result<TokenPair, CoreError> {
        self.try_generate_tokens(user_id).await.map_err(|e| {
            tracing::error!(user_id, error = %e, "Token generation failed");
            CoreError::Internal(TOKEN_GENERATION_FAILED.into())
        })
    }

    /// Exchange a live refresh token for a fresh pair (rotation).
    ///
    /// The presented token must verify and must still equal the stored copy;
    /// a superseded or already-rotated token is rejected.
    pub async fn refresh_session(&self, incoming: &str) -> Result<TokenPair, CoreError> {
        if incoming.trim().is_empty() {
            return Err(CoreError::Unauthorized("Unauthorized request".into()));
        }

        let claims = self.issuer.verify_refresh_token(incoming).map_err(|e| {
            tracing::debug!(error = %e, "Rejected refresh token");
            CoreError::Unauthorized("Invalid refresh token".into())
        })?;

        let user = self
            .store
            .find_by_id(claims.sub)
            .await
            .map_err(|e| store_failure(e, STORE_UNAVAILABLE))?
            .ok_or_else(|| CoreError::Unauthorized("Invalid refresh token".into()))?;

        if user.refresh_token.as_deref() != Some(incoming) {
            tracing::warn!(user_id = user.id, "Presented refresh token is not the live one");
            return Err(CoreError::Unauthorized(
                "Refresh token is expired or used".into(),
            ));
        }

        let tokens = self.generate_access_and_refresh_tokens(user.id).await?;
        tracing::info!(user_id = user.id, "Session refreshed");
        Ok(tokens)
    }

    /// End the user's session by clearing the stored refresh token.
    pub async fn logout_user(&self, user_id: DbId) -> Result<(), CoreError> {
        let cleared = self
            .store
            .save_refresh_token(user_id, None)
            .await
            .map_err(|e| store_failure(e, STORE_UNAVAILABLE))?;
        if !cleared {
            tracing::warn!(user_id, "Logout for a user that no longer exists");
        }
        tracing::info!(user_id, "User logged out");
        Ok(())
    }

    /// Profile of an authenticated user.
    pub async fn current_user(&self, user_id: DbId) -> Result<UserProfile, CoreError> {
        self.store
            .find_profile_by_id(user_id)
            .await
            .map_err(|e| store_failure(e, STORE_UNAVAILABLE))?
            .ok_or_else(|| CoreError::NotFound("User does not exist".into()))
    }

    async fn try_generate_tokens(&self, user_id: DbId) -> Result<TokenPair, TokenGenerationError> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(TokenGenerationError::UserVanished(user_id))?;

        let access_token = self.issuer.mint_access_token(&user)?;
        let refresh_token = self.issuer.mint_refresh_token(&user)?;

        if !self
            .store
            .save_refresh_token(user.id, Some(&refresh_token))
            .await?
        {
            return Err(TokenGenerationError::UserVanished(user_id));
        }

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Upload a staged file; any failure is logged and reported as `None`.
    async fn upload(&self, path: &Path) -> Option<String> {
        match self.uploader.upload(path).await {
            Ok(asset) => Some(asset.url),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Asset upload failed");
                None
            }
        }
    }
}

fn duplicate_identity() -> CoreError {
    CoreError::Conflict("User with email or username already exists".into())
}

fn store_failure(err: StoreError, message: &str) -> CoreError {
    tracing::error!(error = %err, "Credential store failure");
    CoreError::Internal(message.into())
}

/// Run CPU-bound password work on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, String>
where
    F: FnOnce() -> Result<T, argon2::password_hash::Error> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(join_err) => Err(join_err.to_string()),
    }
}
