// SPDX-License-Identifier: AGPL-3.0-or-later
//! # Legacy Vault Endpoints
//!
//! Recipients and encrypted legacy items, plus the simulate dry run.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `GET`/`POST` | `/legacy/recipient` | `list_recipients` / `create_recipient` |
//! | `PUT`/`DELETE` | `/legacy/recipient/:id` | `update_recipient` / `delete_recipient` |
//! | `GET`/`POST` | `/legacy/` | `list_items` / `create_item` |
//! | `PUT`/`DELETE` | `/legacy/:id` | `update_item` / `delete_item` |
//! | `POST` | `/legacy/simulate-release` | `simulate_release` |
//!
//! Plaintext crosses this boundary exactly twice: inbound on item
//! create/update (encrypted before the store insert) and never outbound —
//! listings carry metadata only, and the dry run reports titles.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use vigil_core::{ItemId, RecipientId};
use vigil_release::SimulationReport;
use vigil_state::{ItemPatch, ItemSummary, Recipient, RecipientPatch};

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request to add a recipient.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateRecipientRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub relationship_description: Option<String>,
}

/// Request to update a recipient. Omitted fields are left unchanged;
/// `relationship_description: null` clears it.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateRecipientRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    #[schema(value_type = Option<String>)]
    pub relationship_description: Option<Option<String>>,
}

/// Request to create a legacy item. `content` is plaintext here and
/// nowhere else.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateItemRequest {
    pub title: String,
    pub content: String,
    pub recipient_ids: Vec<RecipientId>,
}

/// Request to update a legacy item. A `content` patch re-encrypts.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateItemRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub recipient_ids: Option<Vec<RecipientId>>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the legacy vault router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/legacy/recipient",
            get(list_recipients).post(create_recipient),
        )
        .route(
            "/legacy/recipient/:id",
            axum::routing::put(update_recipient).delete(delete_recipient),
        )
        .route("/legacy/", get(list_items).post(create_item))
        .route(
            "/legacy/:id",
            axum::routing::put(update_item).delete(delete_item),
        )
        .route("/legacy/simulate-release", post(simulate_release))
}

// ---------------------------------------------------------------------------
// Recipient handlers
// ---------------------------------------------------------------------------

/// GET /legacy/recipient — List the caller's recipients.
#[utoipa::path(
    get,
    path = "/legacy/recipient",
    responses((status = 200, description = "Recipients", body = [Recipient])),
    security(("bearer_auth" = [])),
    tag = "legacy"
)]
pub async fn list_recipients(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Json<Vec<Recipient>> {
    Json(state.vault.list_recipients(user))
}

/// POST /legacy/recipient — Add a recipient.
#[utoipa::path(
    post,
    path = "/legacy/recipient",
    request_body = CreateRecipientRequest,
    responses(
        (status = 201, description = "Recipient created", body = Recipient),
        (status = 422, description = "Empty name or email", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "legacy"
)]
pub async fn create_recipient(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateRecipientRequest>,
) -> Result<impl IntoResponse, AppError> {
    let recipient = state.vault.add_recipient(
        user,
        &req.name,
        &req.email,
        req.relationship_description,
        state.now(),
    )?;
    persist_recipient(&state, &recipient).await;
    Ok((StatusCode::CREATED, Json(recipient)))
}

/// PUT /legacy/recipient/:id — Update a recipient.
#[utoipa::path(
    put,
    path = "/legacy/recipient/{id}",
    params(("id" = Uuid, Path, description = "Recipient id")),
    request_body = UpdateRecipientRequest,
    responses(
        (status = 200, description = "Recipient updated", body = Recipient),
        (status = 404, description = "No such recipient", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "legacy"
)]
pub async fn update_recipient(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRecipientRequest>,
) -> Result<Json<Recipient>, AppError> {
    let patch = RecipientPatch {
        name: req.name,
        email: req.email,
        relationship_description: req.relationship_description,
    };
    let recipient =
        state
            .vault
            .update_recipient(user, RecipientId::from_uuid(id), patch, state.now())?;
    persist_recipient(&state, &recipient).await;
    Ok(Json(recipient))
}

/// DELETE /legacy/recipient/:id — Remove a recipient.
///
/// Cascades out of every item's assignment set; items left with no
/// recipients stay stored but are excluded from any release.
#[utoipa::path(
    delete,
    path = "/legacy/recipient/{id}",
    params(("id" = Uuid, Path, description = "Recipient id")),
    responses(
        (status = 204, description = "Recipient deleted"),
        (status = 404, description = "No such recipient", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "legacy"
)]
pub async fn delete_recipient(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let id = RecipientId::from_uuid(id);
    state.vault.delete_recipient(user, id)?;
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::vault::delete_recipient(pool, id).await {
            tracing::warn!(error = %e, recipient = %id, "failed to delete persisted recipient");
        }
        persist_items(&state, user).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Item handlers
// ---------------------------------------------------------------------------

/// GET /legacy/ — List item metadata. No content, encrypted or otherwise.
#[utoipa::path(
    get,
    path = "/legacy/",
    responses((status = 200, description = "Item summaries", body = [ItemSummary])),
    security(("bearer_auth" = [])),
    tag = "legacy"
)]
pub async fn list_items(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Json<Vec<ItemSummary>> {
    Json(state.vault.list_items(user))
}

/// POST /legacy/ — Create an encrypted legacy item.
#[utoipa::path(
    post,
    path = "/legacy/",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = ItemSummary),
        (status = 422, description = "Empty title or bad recipient set", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "legacy"
)]
pub async fn create_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    let summary = state.vault.create_item(
        user,
        &req.title,
        &req.content,
        req.recipient_ids,
        state.now(),
    )?;
    persist_item(&state, user, summary.id).await;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// PUT /legacy/:id — Update an item; a content patch re-encrypts.
#[utoipa::path(
    put,
    path = "/legacy/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Item updated", body = ItemSummary),
        (status = 404, description = "No such item", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "legacy"
)]
pub async fn update_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<ItemSummary>, AppError> {
    let patch = ItemPatch {
        title: req.title,
        plaintext: req.content,
        recipient_ids: req.recipient_ids,
    };
    let summary = state
        .vault
        .update_item(user, ItemId::from_uuid(id), patch, state.now())?;
    persist_item(&state, user, summary.id).await;
    Ok(Json(summary))
}

/// DELETE /legacy/:id — Delete an item.
#[utoipa::path(
    delete,
    path = "/legacy/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 404, description = "No such item", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "legacy"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let id = ItemId::from_uuid(id);
    state.vault.delete_item(user, id)?;
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::vault::delete_item(pool, id).await {
            tracing::warn!(error = %e, item = %id, "failed to delete persisted item");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Simulate
// ---------------------------------------------------------------------------

/// POST /legacy/simulate-release — Dry run of the release.
///
/// Refused (403) while the caller is not overdue; an un-fired switch's
/// vault is not previewable. No dispatch, no release record.
#[utoipa::path(
    post,
    path = "/legacy/simulate-release",
    responses(
        (status = 200, description = "Dry-run report", body = SimulationReport),
        (status = 403, description = "Caller is not overdue", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "legacy"
)]
pub async fn simulate_release(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<SimulationReport>, AppError> {
    Ok(Json(state.coordinator.simulate(user)?))
}

// ---------------------------------------------------------------------------
// Persistence mirroring (best-effort; memory is the source of truth)
// ---------------------------------------------------------------------------

async fn persist_recipient(state: &AppState, recipient: &Recipient) {
    let Some(pool) = &state.db_pool else { return };
    if let Err(e) = crate::db::vault::save_recipient(pool, recipient).await {
        tracing::warn!(error = %e, recipient = %recipient.id, "failed to persist recipient");
    }
}

async fn persist_item(state: &AppState, user: vigil_core::UserId, id: ItemId) {
    let Some(pool) = &state.db_pool else { return };
    let Some(item) = state
        .vault
        .snapshot_items()
        .into_iter()
        .find(|i| i.owner_id == user && i.id == id)
    else {
        return;
    };
    if let Err(e) = crate::db::vault::save_item(pool, &item).await {
        tracing::warn!(error = %e, item = %id, "failed to persist vault item");
    }
}

async fn persist_items(state: &AppState, user: vigil_core::UserId) {
    let Some(pool) = &state.db_pool else { return };
    for item in state
        .vault
        .snapshot_items()
        .into_iter()
        .filter(|i| i.owner_id == user)
    {
        if let Err(e) = crate::db::vault::save_item(pool, &item).await {
            tracing::warn!(error = %e, item = %item.id, "failed to persist vault item");
        }
    }
}
