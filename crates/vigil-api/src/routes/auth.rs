//! # Account Endpoints
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `POST` | `/auth/register` | `register` |
//! | `POST` | `/auth/login` | `login` |
//! | `GET`  | `/auth/me` | `me` |
//!
//! Login is form-encoded (`username` + `password`) and answers with a
//! bearer token. Registration also arms the user's presence record with
//! the default check-in interval.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use vigil_core::UserId;
use vigil_crypto::{hash_password, verify_password};
use vigil_state::User;

use crate::auth::{issue_token, CurrentUser};
use crate::error::AppError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request to create an account.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Form-encoded login credentials. The field is `username` for
/// compatibility with standard OAuth2 password-flow clients; it carries
/// the email address.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// A signed access token.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Public view of an account. Never carries the password hash.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /auth/register — Create an account.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid email or password", body = crate::error::ErrorBody),
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.password.len() < 8 {
        return Err(AppError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }

    let password_hash =
        hash_password(&req.password).map_err(|e| AppError::Internal(e.to_string()))?;
    let now = state.now();
    let user = state.users.register(&req.email, password_hash, now)?;

    // Arm the switch: a fresh account gets a presence record with the
    // default interval, but no check-in anchor yet.
    state.presence.ensure(user.id, now);

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::users::save(pool, &user).await {
            tracing::warn!(error = %e, user = %user.id, "failed to persist user");
        }
        let record = vigil_core::PresenceRecord::new(user.id, now);
        if let Err(e) = crate::db::presence::save(pool, &record).await {
            tracing::warn!(error = %e, user = %user.id, "failed to persist presence record");
        }
    }

    tracing::info!(user = %user.id, "account registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// POST /auth/login — Exchange credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/auth/login",
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Bad credentials", body = crate::error::ErrorBody),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    // One failure message for both unknown email and wrong password, so
    // the endpoint does not confirm which addresses have accounts.
    let bad_credentials = || AppError::Unauthorized("incorrect email or password".into());

    let user = state
        .users
        .find_by_email(&form.username)
        .ok_or_else(bad_credentials)?;
    let valid = verify_password(&form.password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !valid {
        return Err(bad_credentials());
    }

    let token = issue_token(&state.config.jwt_secret, user.id, state.now())?;
    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

/// GET /auth/me — The authenticated account.
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current account", body = UserResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.users.get(user_id)?;
    Ok(Json(UserResponse::from(user)))
}
