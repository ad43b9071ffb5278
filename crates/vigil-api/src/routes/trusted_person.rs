// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Trusted Person Endpoints
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `GET`/`POST` | `/api/trusted-person` | `get_one` / `create` |
//! | `PUT`/`DELETE` | `/api/trusted-person` | `update` / `delete` |
//! | `POST` | `/api/trusted-person/verify` | `start_verification` |
//! | `GET` | `/api/trusted-person/verify/:token` | `redeem_token` |
//!
//! The token redemption endpoint is the only unauthenticated route in
//! this module; the contact clicks the link from their own inbox and
//! holds no account. It is mounted separately in the app assembly.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use vigil_state::{TrustedContact, TrustedContactPatch};

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request to designate a trusted contact.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateTrustedContactRequest {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub relationship_to_user: Option<String>,
    #[serde(default)]
    pub personal_note: Option<String>,
}

/// Request to update the trusted contact.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateTrustedContactRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    #[schema(value_type = Option<String>)]
    pub relationship_to_user: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    #[schema(value_type = Option<String>)]
    pub personal_note: Option<Option<String>>,
}

// ---------------------------------------------------------------------------
// Routers
// ---------------------------------------------------------------------------

/// Build the authenticated trusted-person router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/trusted-person",
            get(get_one).post(create).put(update).delete(delete),
        )
        .route("/api/trusted-person/verify", post(start_verification))
}

/// Build the unauthenticated token-redemption router.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/api/trusted-person/verify/:token", get(redeem_token))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/trusted-person — Fetch the designated contact.
#[utoipa::path(
    get,
    path = "/api/trusted-person",
    responses(
        (status = 200, description = "The trusted contact", body = TrustedContact),
        (status = 404, description = "No contact designated", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "trusted-person"
)]
pub async fn get_one(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<TrustedContact>, AppError> {
    Ok(Json(state.trusted.get(user)?))
}

/// POST /api/trusted-person — Designate a trusted contact.
#[utoipa::path(
    post,
    path = "/api/trusted-person",
    request_body = CreateTrustedContactRequest,
    responses(
        (status = 201, description = "Contact designated", body = TrustedContact),
        (status = 409, description = "A contact already exists", body = crate::error::ErrorBody),
        (status = 422, description = "Empty name or email", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "trusted-person"
)]
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateTrustedContactRequest>,
) -> Result<impl IntoResponse, AppError> {
    let contact = state.trusted.create(
        user,
        &req.full_name,
        &req.email,
        req.phone,
        req.relationship_to_user,
        req.personal_note,
        state.now(),
    )?;
    persist(&state, &contact).await;
    Ok((StatusCode::CREATED, Json(contact)))
}

/// PUT /api/trusted-person — Update the designated contact.
#[utoipa::path(
    put,
    path = "/api/trusted-person",
    request_body = UpdateTrustedContactRequest,
    responses(
        (status = 200, description = "Contact updated", body = TrustedContact),
        (status = 404, description = "No contact designated", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "trusted-person"
)]
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<UpdateTrustedContactRequest>,
) -> Result<Json<TrustedContact>, AppError> {
    let patch = TrustedContactPatch {
        full_name: req.full_name,
        email: req.email,
        phone: req.phone,
        relationship_to_user: req.relationship_to_user,
        personal_note: req.personal_note,
    };
    let contact = state.trusted.update(user, patch, state.now())?;
    persist(&state, &contact).await;
    Ok(Json(contact))
}

/// DELETE /api/trusted-person — Remove the designated contact.
#[utoipa::path(
    delete,
    path = "/api/trusted-person",
    responses(
        (status = 204, description = "Contact removed"),
        (status = 404, description = "No contact designated", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "trusted-person"
)]
pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, AppError> {
    state.trusted.delete(user)?;
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::trusted::delete(pool, user).await {
            tracing::warn!(error = %e, user = %user, "failed to delete persisted trusted contact");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/trusted-person/verify — Send a verification link.
///
/// Issues a fresh token and emails the link through the configured
/// relay. A relay failure marks the contact FAILED and surfaces 503;
/// the token stays valid so a retry reuses the flow, not the token.
#[utoipa::path(
    post,
    path = "/api/trusted-person/verify",
    responses(
        (status = 200, description = "Verification email sent", body = TrustedContact),
        (status = 404, description = "No contact designated", body = crate::error::ErrorBody),
        (status = 503, description = "Mail relay unavailable", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "trusted-person"
)]
pub async fn start_verification(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<TrustedContact>, AppError> {
    let now = state.now();
    let (contact, token) = state.trusted.start_verification(user, now)?;
    let verify_url = format!(
        "{}/api/trusted-person/verify/{token}",
        state.config.public_base_url.trim_end_matches('/')
    );

    if let Err(e) = state
        .notifier
        .send_verification(&contact.email, &verify_url)
        .await
    {
        tracing::warn!(error = %e, user = %user, "verification email dispatch failed");
        state.trusted.mark_failed(user, now)?;
        let failed = state.trusted.get(user)?;
        persist(&state, &failed).await;
        return Err(e.into());
    }

    let contact = state.trusted.get(user)?;
    persist(&state, &contact).await;
    Ok(Json(contact))
}

/// GET /api/trusted-person/verify/:token — Redeem a verification link.
///
/// Unauthenticated: the contact follows this from their inbox.
#[utoipa::path(
    get,
    path = "/api/trusted-person/verify/{token}",
    params(("token" = String, Path, description = "Verification token")),
    responses(
        (status = 200, description = "Email verified", body = TrustedContact),
        (status = 404, description = "Unknown or spent token", body = crate::error::ErrorBody),
    ),
    tag = "trusted-person"
)]
pub async fn redeem_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<TrustedContact>, AppError> {
    let contact = state.trusted.verify_token(&token, state.now())?;
    persist(&state, &contact).await;
    Ok(Json(contact))
}

async fn persist(state: &AppState, contact: &TrustedContact) {
    let Some(pool) = &state.db_pool else { return };
    if let Err(e) = crate::db::trusted::save(pool, contact).await {
        tracing::warn!(error = %e, user = %contact.owner_id, "failed to persist trusted contact");
    }
}
