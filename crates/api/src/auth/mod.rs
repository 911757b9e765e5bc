//! Authentication and session lifecycle.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- access/refresh token minting and verification.
//! - [`session`] -- registration, login, refresh rotation and logout.
//! - [`cookies`] -- `Set-Cookie` construction and cookie lookup.

pub mod cookies;
pub mod jwt;
pub mod password;
pub mod session;
