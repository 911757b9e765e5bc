use std::sync::Arc;

use crate::auth::session::SessionManager;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`). No session state
/// lives here; it is all in the credential store behind the session manager.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Registration, login and token lifecycle.
    pub sessions: Arc<SessionManager>,
}
