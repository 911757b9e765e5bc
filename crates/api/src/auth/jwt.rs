//! Access and refresh token minting and verification.
//!
//! Both tokens are HS256-signed JWTs bound to the user's id, but they are
//! signed with **different secrets** and carry **independent lifetimes**. A
//! leaked access token expires on its own within minutes; a leaked refresh
//! token is the one thing revoked server-side, by overwriting or clearing the
//! copy stored on the user row.

use std::fmt;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tollgate_core::types::DbId;
use tollgate_db::models::user::User;
use uuid::Uuid;

use crate::config::{env_or, required, ConfigError};

/// Claims embedded in every access token.
///
/// Carries the identity keys so downstream checks need no store lookup.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Subject -- the user's internal database id.
    pub sub: DbId,
    pub username: String,
    pub email: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4).
    pub jti: String,
}

/// Claims embedded in every refresh token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: DbId,
    pub exp: i64,
    pub iat: i64,
    /// Makes two refresh tokens minted in the same second distinct.
    pub jti: String,
}

/// An access token and refresh token issued together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Secrets and lifetimes for both token kinds.
#[derive(Clone)]
pub struct TokenConfig {
    /// HMAC-SHA256 secret for access tokens.
    pub access_secret: String,
    /// Access token lifetime in minutes (default: 15).
    pub access_expiry_mins: i64,
    /// HMAC-SHA256 secret for refresh tokens. Must differ from `access_secret`.
    pub refresh_secret: String,
    /// Refresh token lifetime in days (default: 10).
    pub refresh_expiry_days: i64,
}

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;
/// Default refresh token expiry in days.
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 10;
/// Longest lifetime either token may be configured with (10 years).
const MAX_LIFETIME_SECS: i64 = 10 * 365 * 24 * 60 * 60;

impl TokenConfig {
    /// Validate a configuration: both secrets present and distinct, both
    /// lifetimes positive, access strictly shorter than refresh.
    pub fn new(
        access_secret: String,
        access_expiry_mins: i64,
        refresh_secret: String,
        refresh_expiry_days: i64,
    ) -> Result<Self, ConfigError> {
        if access_secret.is_empty() {
            return Err(ConfigError::Missing("ACCESS_TOKEN_SECRET"));
        }
        if refresh_secret.is_empty() {
            return Err(ConfigError::Missing("REFRESH_TOKEN_SECRET"));
        }
        if access_secret == refresh_secret {
            return Err(ConfigError::Invalid {
                var: "REFRESH_TOKEN_SECRET",
                reason: "must differ from ACCESS_TOKEN_SECRET".into(),
            });
        }
        let access_ttl = lifetime_secs("ACCESS_TOKEN_EXPIRY_MINS", access_expiry_mins, 60)?;
        let refresh_ttl =
            lifetime_secs("REFRESH_TOKEN_EXPIRY_DAYS", refresh_expiry_days, 24 * 60 * 60)?;
        if access_ttl >= refresh_ttl {
            return Err(ConfigError::Invalid {
                var: "ACCESS_TOKEN_EXPIRY_MINS",
                reason: "access tokens must expire before refresh tokens".into(),
            });
        }

        Ok(Self {
            access_secret,
            access_expiry_mins,
            refresh_secret,
            refresh_expiry_days,
        })
    }

    /// Load token configuration from environment variables.
    ///
    /// | Env Var                     | Required | Default |
    /// |-----------------------------|----------|---------|
    /// | `ACCESS_TOKEN_SECRET`       | **yes**  | --      |
    /// | `ACCESS_TOKEN_EXPIRY_MINS`  | no       | `15`    |
    /// | `REFRESH_TOKEN_SECRET`      | **yes**  | --      |
    /// | `REFRESH_TOKEN_EXPIRY_DAYS` | no       | `10`    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(
            required("ACCESS_TOKEN_SECRET")?,
            env_or("ACCESS_TOKEN_EXPIRY_MINS", DEFAULT_ACCESS_EXPIRY_MINS)?,
            required("REFRESH_TOKEN_SECRET")?,
            env_or("REFRESH_TOKEN_EXPIRY_DAYS", DEFAULT_REFRESH_EXPIRY_DAYS)?,
        )
    }

    /// Access token lifetime in seconds.
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_expiry_mins.saturating_mul(60)
    }

    /// Refresh token lifetime in seconds.
    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_expiry_days.saturating_mul(24 * 60 * 60)
    }
}

/// Convert a configured lifetime to seconds, rejecting non-positive values and
/// anything beyond [`MAX_LIFETIME_SECS`].
fn lifetime_secs(var: &'static str, value: i64, unit_secs: i64) -> Result<i64, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::Invalid {
            var,
            reason: "must be positive".into(),
        });
    }
    value
        .checked_mul(unit_secs)
        .filter(|secs| *secs <= MAX_LIFETIME_SECS)
        .ok_or_else(|| ConfigError::Invalid {
            var,
            reason: format!("must not exceed {} days", MAX_LIFETIME_SECS / (24 * 60 * 60)),
        })
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_secret", &"<redacted>")
            .field("access_expiry_mins", &self.access_expiry_mins)
            .field("refresh_secret", &"<redacted>")
            .field("refresh_expiry_days", &self.refresh_expiry_days)
            .finish()
    }
}

/// Mints and verifies session tokens.
///
/// Minting is pure: it reads only the already-loaded [`User`] and the clock.
#[derive(Clone)]
pub struct TokenIssuer {
    config: TokenConfig,
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
}

impl TokenIssuer {
    pub fn new(config: TokenConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            config,
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Mint a short-lived access token for `user`.
    pub fn mint_access_token(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now().timestamp();
        let claims = AccessClaims {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            exp: now + self.config.access_ttl_secs(),
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::default(), &claims, &self.access_encoding)
    }

    /// Mint a long-lived refresh token for `user`.
    pub fn mint_refresh_token(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: user.id,
            exp: now + self.config.refresh_ttl_secs(),
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::default(), &claims, &self.refresh_encoding)
    }

    /// Validate an access token's signature and expiry.
    pub fn verify_access_token(
        &self,
        token: &str,
    ) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
        let data = decode::<AccessClaims>(token, &self.access_decoding, &Validation::default())?;
        Ok(data.claims)
    }

    /// Validate a refresh token's signature and expiry.
    ///
    /// This proves only that the token was minted here and is unexpired; the
    /// caller must still compare it with the copy on the user row.
    pub fn verify_refresh_token(
        &self,
        token: &str,
    ) -> Result<RefreshClaims, jsonwebtoken::errors::Error> {
        let data = decode::<RefreshClaims>(token, &self.refresh_decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn test_config() -> TokenConfig {
        TokenConfig::new(
            "access-secret-that-is-long-enough".to_string(),
            15,
            "refresh-secret-that-is-long-enough".to_string(),
            10,
        )
        .expect("valid config")
    }

    fn test_user() -> User {
        let now = chrono::Utc::now();
        User {
            id: 42,
            username: "annl".into(),
            email: "ann@x.com".into(),
            full_name: "Ann Lee".into(),
            avatar_url: "https://cdn.example/a.png".into(),
            cover_image_url: String::new(),
            password_hash: "hash".into(),
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let issuer = TokenIssuer::new(test_config());
        let token = issuer.mint_access_token(&test_user()).unwrap();

        let claims = issuer.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.username, "annl");
        assert_eq!(claims.email, "ann@x.com");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_refresh_token_outlives_access_token() {
        let issuer = TokenIssuer::new(test_config());
        let user = test_user();
        let access = issuer
            .verify_access_token(&issuer.mint_access_token(&user).unwrap())
            .unwrap();
        let refresh = issuer
            .verify_refresh_token(&issuer.mint_refresh_token(&user).unwrap())
            .unwrap();

        assert_eq!(refresh.sub, access.sub);
        assert_eq!(refresh.exp - refresh.iat, 10 * 24 * 60 * 60);
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn test_token_kinds_do_not_cross_verify() {
        let issuer = TokenIssuer::new(test_config());
        let user = test_user();
        let access = issuer.mint_access_token(&user).unwrap();
        let refresh = issuer.mint_refresh_token(&user).unwrap();

        assert!(issuer.verify_refresh_token(&access).is_err());
        assert!(issuer.verify_access_token(&refresh).is_err());
    }

    #[test]
    fn test_oversized_lifetimes_are_rejected() {
        let err = TokenConfig::new("a".into(), 15, "r".into(), i64::MAX).unwrap_err();
        assert_matches!(err, ConfigError::Invalid { var: "REFRESH_TOKEN_EXPIRY_DAYS", .. });

        let err = TokenConfig::new("a".into(), 15, "r".into(), 100_000).unwrap_err();
        assert_matches!(err, ConfigError::Invalid { var: "REFRESH_TOKEN_EXPIRY_DAYS", .. });

        let err = TokenConfig::new("a".into(), i64::MAX / 2, "r".into(), 10).unwrap_err();
        assert_matches!(err, ConfigError::Invalid { var: "ACCESS_TOKEN_EXPIRY_MINS", .. });

        let config = TokenConfig::new("a".into(), 15, "r".into(), 3650).unwrap();
        assert_eq!(config.refresh_ttl_secs(), 3650 * 24 * 60 * 60);
    }

    #[test]
    fn test_refresh_tokens_are_unique() {
        let issuer = TokenIssuer::new(test_config());
        let user = test_user();
        let first = issuer.mint_refresh_token(&user).unwrap();
        let second = issuer.mint_refresh_token(&user).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_expired_refresh_token_fails() {
        let config = test_config();
        let issuer = TokenIssuer::new(config.clone());

        // Well past the default 60-second leeway.
        let now = chrono::Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: 1,
            exp: now - 300,
            iat: now - 600,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.refresh_secret.as_bytes()),
        )
        .unwrap();

        assert!(issuer.verify_refresh_token(&token).is_err());
    }

    #[test]
    fn test_tampered_token_fails() {
        let issuer = TokenIssuer::new(test_config());
        let mut token = issuer.mint_access_token(&test_user()).unwrap();
        token.push('x');
        assert!(issuer.verify_access_token(&token).is_err());
    }

    #[test]
    fn test_config_rejects_missing_or_shared_secret() {
        assert_matches!(
            TokenConfig::new(String::new(), 15, "refresh".into(), 10),
            Err(ConfigError::Missing("ACCESS_TOKEN_SECRET"))
        );
        assert_matches!(
            TokenConfig::new("access".into(), 15, String::new(), 10),
            Err(ConfigError::Missing("REFRESH_TOKEN_SECRET"))
        );
        assert_matches!(
            TokenConfig::new("same".into(), 15, "same".into(), 10),
            Err(ConfigError::Invalid { var: "REFRESH_TOKEN_SECRET", .. })
        );
    }

    #[test]
    fn test_config_rejects_inverted_lifetimes() {
        assert_matches!(
            TokenConfig::new("access".into(), 0, "refresh".into(), 10),
            Err(ConfigError::Invalid { var: "ACCESS_TOKEN_EXPIRY_MINS", .. })
        );
        assert_matches!(
            TokenConfig::new("access".into(), 24 * 60, "refresh".into(), 1),
            Err(ConfigError::Invalid { var: "ACCESS_TOKEN_EXPIRY_MINS", .. })
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", test_config());
        assert!(!rendered.contains("access-secret"));
        assert!(!rendered.contains("refresh-secret"));
    }
}
