//! Normalization and validation of account credentials.
//!
//! Both register and login input arrive as loosely-typed request fields.
//! [`RegisterFields::normalize`] and [`LoginFields::normalize`] turn them into
//! the canonical form the store is queried with, or reject them with
//! [`CoreError::Validation`] before any I/O happens.

use std::fmt;

use serde::Deserialize;
use validator::ValidateEmail;

use crate::error::CoreError;

/// Text fields submitted on registration.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterFields {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Credentials submitted on login.
///
/// Both identifiers are required; the account is looked up by either.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginFields {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Lower-case a username so lookups and uniqueness are case-insensitive.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

impl RegisterFields {
    /// Trim the identity fields, lower-case the username and check that every
    /// field is present.
    ///
    /// The password is checked for blankness but kept byte-for-byte.
    pub fn normalize(self) -> Result<RegisterFields, CoreError> {
        let all_present = [&self.full_name, &self.email, &self.username, &self.password]
            .iter()
            .all(|field| !field.trim().is_empty());
        if !all_present {
            return Err(CoreError::Validation("All fields are required".into()));
        }

        let email = self.email.trim().to_string();
        if !email.validate_email() {
            return Err(CoreError::Validation("Email address is not valid".into()));
        }

        Ok(RegisterFields {
            full_name: self.full_name.trim().to_string(),
            email,
            username: normalize_username(&self.username),
            password: self.password,
        })
    }
}

impl LoginFields {
    /// Require both identifiers and a password; lower-case the username.
    pub fn normalize(self) -> Result<LoginFields, CoreError> {
        if self.email.trim().is_empty() || self.username.trim().is_empty() {
            return Err(CoreError::Validation(
                "Username and email are required".into(),
            ));
        }
        if self.password.is_empty() {
            return Err(CoreError::Validation("Password is required".into()));
        }

        Ok(LoginFields {
            email: self.email.trim().to_string(),
            username: normalize_username(&self.username),
            password: self.password,
        })
    }
}

// Passwords must never reach logs through `{:?}`.

impl fmt::Debug for RegisterFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterFields")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for LoginFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginFields")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
