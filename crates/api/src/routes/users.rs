//! Route definitions for the `/users` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// POST /register       -> register (multipart)
/// POST /login          -> login
/// POST /refresh-token  -> refresh_token
/// POST /logout         -> logout (requires auth)
/// GET  /current-user   -> current_user (requires auth)
/// ```
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/register",
            post(users::register).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/login", post(users::login))
        .route("/refresh-token", post(users::refresh_token))
        .route("/logout", post(users::logout))
        .route("/current-user", get(users::current_user))
}
