//! Handlers for the `/users` resource (register, login, refresh, logout).

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use tollgate_core::credentials::LoginFields;
use tollgate_db::models::user::UserProfile;
use uuid::Uuid;

use crate::assets::remove_staged_file;
use crate::auth::cookies::{
    cleared_cookie_headers, read_cookie, session_cookie_headers, REFRESH_TOKEN_COOKIE,
};
use crate::auth::jwt::TokenPair;
use crate::auth::session::RegisterInput;
use crate::error::{AppError, AppResult};
use crate::extract::{AppJson, AppMultipart};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Optional JSON body for `POST /users/refresh-token`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Payload of a successful login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/users/register
///
/// `multipart/form-data` with text fields `fullName`, `email`, `username`,
/// `password` and files `avatar` (required) and `coverImage` (optional).
/// Returns the created user, secrets excluded, with 201 Created.
pub async fn register(
    State(state): State<AppState>,
    AppMultipart(mut multipart): AppMultipart,
) -> AppResult<(StatusCode, Json<ApiResponse<UserProfile>>)> {
    let staging_dir = &state.config.uploads.staging_dir;
    tokio::fs::create_dir_all(staging_dir)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to create staging dir: {e}")))?;

    let mut staged = Vec::new();
    let result = match read_register_form(&mut multipart, staging_dir, &mut staged).await {
        Ok(input) => state
            .sessions
            .register_user(input)
            .await
            .map_err(AppError::from),
        Err(e) => Err(e),
    };

    // The uploader removes what it consumed; this catches anything it never saw.
    for path in &staged {
        remove_staged_file(path).await;
    }

    let user = result?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            StatusCode::CREATED,
            user,
            "User registered successfully",
        )),
    ))
}

/// POST /api/v1/users/login
///
/// Authenticate with email + username + password. Sets the `accessToken` and
/// `refreshToken` cookies and echoes both tokens in the body.
pub async fn login(
    State(state): State<AppState>,
    AppJson(input): AppJson<LoginFields>,
) -> AppResult<(StatusCode, HeaderMap, Json<ApiResponse<LoginResponse>>)> {
    let outcome = state.sessions.login_user(input).await?;
    let cookies = session_cookie_headers(&outcome.tokens, state.sessions.issuer().config())?;

    let body = LoginResponse {
        user: outcome.user,
        access_token: outcome.tokens.access_token,
        refresh_token: outcome.tokens.refresh_token,
    };

    Ok((
        StatusCode::OK,
        cookies,
        Json(ApiResponse::new(
            StatusCode::OK,
            body,
            "User logged in successfully",
        )),
    ))
}

/// POST /api/v1/users/refresh-token
///
/// Rotate the session. The refresh token is read from the `refreshToken`
/// cookie, falling back to a JSON body `{ "refreshToken": "..." }`.
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<(StatusCode, HeaderMap, Json<ApiResponse<TokenPair>>)> {
    let incoming = read_cookie(&headers, REFRESH_TOKEN_COOKIE)
        .or_else(|| {
            serde_json::from_slice::<RefreshRequest>(&body)
                .ok()
                .and_then(|req| req.refresh_token)
        })
        .unwrap_or_default();

    let tokens = state.sessions.refresh_session(&incoming).await?;
    let cookies = session_cookie_headers(&tokens, state.sessions.issuer().config())?;

    Ok((
        StatusCode::OK,
        cookies,
        Json(ApiResponse::new(StatusCode::OK, tokens, "Access token refreshed")),
    ))
}

/// POST /api/v1/users/logout
///
/// Clear the stored refresh token and both cookies.
pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<(StatusCode, HeaderMap, Json<ApiResponse<serde_json::Value>>)> {
    state.sessions.logout_user(auth_user.user_id).await?;

    Ok((
        StatusCode::OK,
        cleared_cookie_headers(),
        Json(ApiResponse::new(
            StatusCode::OK,
            serde_json::json!({}),
            "User logged out",
        )),
    ))
}

/// GET /api/v1/users/current-user
pub async fn current_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let user = state.sessions.current_user(auth_user.user_id).await?;
    Ok(Json(ApiResponse::new(
        StatusCode::OK,
        user,
        "Current user fetched successfully",
    )))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Collect the registration form, staging image files under `staging_dir`.
///
/// Every staged path is pushed onto `staged` as soon as it is written, so the
/// caller can clean up even when parsing fails halfway.
async fn read_register_form(
    multipart: &mut Multipart,
    staging_dir: &Path,
    staged: &mut Vec<PathBuf>,
) -> AppResult<RegisterInput> {
    let mut input = RegisterInput::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "fullName" => input.fields.full_name = read_text(field).await?,
            "email" => input.fields.email = read_text(field).await?,
            "username" => input.fields.username = read_text(field).await?,
            "password" => input.fields.password = read_text(field).await?,
            // Only the first file of each kind is used.
            "avatar" if input.avatar.is_none() => {
                input.avatar = stage_file(field, staging_dir, staged).await?;
            }
            "coverImage" if input.cover_image.is_none() => {
                input.cover_image = stage_file(field, staging_dir, staged).await?;
            }
            _ => tracing::debug!(field = %name, "Ignoring multipart field"),
        }
    }

    Ok(input)
}

async fn read_text(field: Field<'_>) -> AppResult<String> {
    Ok(field.text().await?)
}

/// Write an uploaded file to the staging dir under a random name.
///
/// An empty part counts as "no file".
async fn stage_file(
    field: Field<'_>,
    staging_dir: &Path,
    staged: &mut Vec<PathBuf>,
) -> AppResult<Option<PathBuf>> {
    let extension = field
        .file_name()
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_lowercase);

    let data = field.bytes().await?;
    if data.is_empty() {
        return Ok(None);
    }

    let file_name = match extension {
        Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
        None => Uuid::new_v4().to_string(),
    };
    let path = staging_dir.join(file_name);
    tokio::fs::write(&path, &data)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to stage upload: {e}")))?;

    staged.push(path.clone());
    Ok(Some(path))
}
