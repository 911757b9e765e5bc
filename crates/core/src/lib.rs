//! Domain building blocks shared by the store and the HTTP layer.
//!
//! - [`error`] -- the error taxonomy every session operation returns.
//! - [`types`] -- id and timestamp aliases.
//! - [`credentials`] -- normalization and validation of register/login input.

pub mod credentials;
pub mod error;
pub mod types;
