//! Request extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from the access token.

pub mod auth;
