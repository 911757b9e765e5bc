pub mod health;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /users/register         register (public, multipart)
/// /users/login            login (public)
/// /users/refresh-token    rotate session (public, refresh token required)
/// /users/logout           logout (requires auth)
/// /users/current-user     current user (requires auth)
/// ```
pub fn api_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new().nest("/users", users::router(max_upload_bytes))
}
