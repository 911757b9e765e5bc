//! Access-token authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tollgate_core::error::CoreError;
use tollgate_core::types::DbId;

use crate::auth::cookies::{read_cookie, ACCESS_TOKEN_COOKIE};
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from the `accessToken` cookie, or from an
/// `Authorization: Bearer <token>` header when no cookie is present.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
    pub username: String,
    pub email: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = read_cookie(&parts.headers, ACCESS_TOKEN_COOKIE)
            .or_else(|| bearer_token(parts))
            .ok_or_else(|| AppError::Core(CoreError::Unauthorized("Unauthorized request".into())))?;

        let claims = state
            .sessions
            .issuer()
            .verify_access_token(&token)
            .map_err(|_| {
                AppError::Core(CoreError::Unauthorized("Invalid or expired access token".into()))
            })?;

        Ok(AuthUser {
            user_id: claims.sub,
            username: claims.username,
            email: claims.email,
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.trim().strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
