//! # Authentication
//!
//! JWT bearer auth (HS256). `/auth/login` exchanges credentials for a
//! signed token carrying the user id; every authenticated handler takes a
//! [`CurrentUser`] extractor, which validates the token against the secret
//! injected into request extensions.
//!
//! Password verification runs in the login handler (Argon2id, constant-time
//! inside the verifier); the token itself carries no secrets beyond `sub`.

use axum::http::header;
use axum::http::request::Parts;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vigil_core::UserId;

use crate::error::AppError;

/// Token lifetime. Long enough for a journaling session, short enough that
/// a leaked token ages out within a day.
pub const TOKEN_TTL_SECS: i64 = 60 * 60 * 24;

/// JWT claims carried by a Vigil access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated user's id.
    pub sub: Uuid,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
}

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the secret to keep it out of logs.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .finish()
    }
}

/// Sign a token for `user` valid for [`TOKEN_TTL_SECS`] from `now`.
pub fn issue_token(
    secret: &str,
    user: UserId,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: *user.as_uuid(),
        exp: now.timestamp() + TOKEN_TTL_SECS,
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
}

/// Validate a token and return the user id it names.
pub fn decode_token(secret: &str, token: &str) -> Result<UserId, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::Unauthorized(format!("invalid token: {e}")))?;
    Ok(UserId::from_uuid(data.claims.sub))
}

/// The authenticated caller, extracted from the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let config = parts
            .extensions
            .get::<AuthConfig>()
            .cloned()
            .ok_or_else(|| AppError::Internal("auth config missing from request".into()))?;

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing authorization header".into()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| {
                AppError::Unauthorized("authorization header must use Bearer scheme".into())
            })?;

        decode_token(&config.jwt_secret, token).map(CurrentUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn issued_token_round_trips() {
        let user = UserId::new();
        let token = issue_token("test-secret", user, Utc::now()).unwrap();
        assert_eq!(decode_token("test-secret", &token).unwrap(), user);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token("secret-a", UserId::new(), Utc::now()).unwrap();
        assert!(matches!(
            decode_token("secret-b", &token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issued = Utc::now() - Duration::seconds(TOKEN_TTL_SECS + 120);
        let token = issue_token("test-secret", UserId::new(), issued).unwrap();
        assert!(matches!(
            decode_token("test-secret", &token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(matches!(
            decode_token("test-secret", "not-a-jwt"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn auth_config_debug_redacts_secret() {
        let config = AuthConfig {
            jwt_secret: "hunter2".into(),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
