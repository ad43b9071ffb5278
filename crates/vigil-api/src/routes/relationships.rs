//! # Relationship Journal Endpoints
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `GET`/`POST` | `/relationships` | `list` / `create` |
//! | `GET`/`PUT`/`DELETE` | `/relationships/:id` | `get_one` / `update` / `delete` |
//!
//! Responses embed the display indicator derived from the entry's state
//! so every client renders the same label and score.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use vigil_core::RelationshipId;
use vigil_state::{Relationship, RelationshipPatch, RelationshipState};

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Request to add a journal entry.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateRelationshipRequest {
    pub name: String,
    #[serde(default)]
    pub relationship_type: Option<String>,
    pub state: RelationshipState,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request to update a journal entry.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateRelationshipRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    #[schema(value_type = Option<String>)]
    pub relationship_type: Option<Option<String>>,
    #[serde(default)]
    pub state: Option<RelationshipState>,
    #[serde(default, deserialize_with = "super::double_option")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    #[schema(value_type = Option<String>)]
    pub last_interaction_at: Option<Option<DateTime<Utc>>>,
}

/// A journal entry plus its display indicator.
#[derive(Debug, Serialize, ToSchema)]
pub struct RelationshipResponse {
    #[serde(flatten)]
    pub relationship: Relationship,
    pub indicator_label: &'static str,
    pub indicator_score: u8,
}

impl From<Relationship> for RelationshipResponse {
    fn from(relationship: Relationship) -> Self {
        let (indicator_label, indicator_score) = relationship.state.indicator();
        Self {
            relationship,
            indicator_label,
            indicator_score,
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the relationships router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/relationships", get(list).post(create))
        .route(
            "/relationships/:id",
            get(get_one).put(update).delete(delete),
        )
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /relationships — List the user's journal.
#[utoipa::path(
    get,
    path = "/relationships",
    responses((status = 200, description = "Journal entries", body = [RelationshipResponse])),
    security(("bearer_auth" = [])),
    tag = "relationships"
)]
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Json<Vec<RelationshipResponse>> {
    Json(
        state
            .relationships
            .list(user)
            .into_iter()
            .map(RelationshipResponse::from)
            .collect(),
    )
}

/// POST /relationships — Add a journal entry.
#[utoipa::path(
    post,
    path = "/relationships",
    request_body = CreateRelationshipRequest,
    responses(
        (status = 201, description = "Entry added", body = RelationshipResponse),
        (status = 422, description = "Empty name", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "relationships"
)]
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateRelationshipRequest>,
) -> Result<impl IntoResponse, AppError> {
    let relationship = state.relationships.create(
        user,
        &req.name,
        req.relationship_type,
        req.state,
        req.notes,
        state.now(),
    )?;
    persist(&state, &relationship).await;
    Ok((StatusCode::CREATED, Json(RelationshipResponse::from(relationship))))
}

/// GET /relationships/:id — Fetch one entry.
#[utoipa::path(
    get,
    path = "/relationships/{id}",
    params(("id" = Uuid, Path, description = "Relationship id")),
    responses(
        (status = 200, description = "The entry", body = RelationshipResponse),
        (status = 404, description = "No such entry", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "relationships"
)]
pub async fn get_one(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RelationshipResponse>, AppError> {
    let relationship = state
        .relationships
        .get(user, RelationshipId::from_uuid(id))?;
    Ok(Json(RelationshipResponse::from(relationship)))
}

/// PUT /relationships/:id — Update an entry.
#[utoipa::path(
    put,
    path = "/relationships/{id}",
    params(("id" = Uuid, Path, description = "Relationship id")),
    request_body = UpdateRelationshipRequest,
    responses(
        (status = 200, description = "Entry updated", body = RelationshipResponse),
        (status = 404, description = "No such entry", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "relationships"
)]
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRelationshipRequest>,
) -> Result<Json<RelationshipResponse>, AppError> {
    let patch = RelationshipPatch {
        name: req.name,
        relationship_type: req.relationship_type,
        state: req.state,
        notes: req.notes,
        last_interaction_at: req.last_interaction_at,
    };
    let relationship =
        state
            .relationships
            .update(user, RelationshipId::from_uuid(id), patch, state.now())?;
    persist(&state, &relationship).await;
    Ok(Json(RelationshipResponse::from(relationship)))
}

/// DELETE /relationships/:id — Delete an entry.
#[utoipa::path(
    delete,
    path = "/relationships/{id}",
    params(("id" = Uuid, Path, description = "Relationship id")),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 404, description = "No such entry", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "relationships"
)]
pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let id = RelationshipId::from_uuid(id);
    state.relationships.delete(user, id)?;
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::relationships::delete(pool, id).await {
            tracing::warn!(error = %e, relationship = %id, "failed to delete persisted relationship");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn persist(state: &AppState, relationship: &Relationship) {
    let Some(pool) = &state.db_pool else { return };
    if let Err(e) = crate::db::relationships::save(pool, relationship).await {
        tracing::warn!(error = %e, relationship = %relationship.id, "failed to persist relationship");
    }
}
