//! # Financial Obligation Endpoints
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `GET`/`POST` | `/api/obligations` | `list` / `create` |
//! | `GET`/`PUT`/`DELETE` | `/api/obligations/:id` | `get_one` / `update` / `delete` |
//! | `POST` | `/api/obligations/:id/settle` | `settle` |
//! | `GET` | `/api/obligations/summary` | `summary` |
//!
//! Amounts arrive as decimal strings with a currency code and are parsed
//! once, at this edge, into integer minor units.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use vigil_core::ObligationId;
use vigil_state::{
    FinancialObligation, Money, ObligationPatch, ObligationStatus, ObligationSummary,
};

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request to record an obligation.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateObligationRequest {
    pub creditor_name: String,
    /// Decimal amount, e.g. `"1250.00"`.
    pub amount: String,
    /// ISO 4217 code, e.g. `"USD"`.
    pub currency: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// Request to update an obligation. Amount and currency travel together.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateObligationRequest {
    #[serde(default)]
    pub creditor_name: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    #[schema(value_type = Option<String>)]
    pub due_date: Option<Option<NaiveDate>>,
}

/// Optional status filter for listings.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListParams {
    #[serde(default)]
    pub status: Option<ObligationStatus>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the obligations router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/obligations", get(list).post(create))
        .route("/api/obligations/summary", get(summary))
        .route(
            "/api/obligations/:id",
            get(get_one).put(update).delete(delete),
        )
        .route("/api/obligations/:id/settle", post(settle))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/obligations — List obligations, optionally by status.
#[utoipa::path(
    get,
    path = "/api/obligations",
    responses((status = 200, description = "Obligations", body = [FinancialObligation])),
    security(("bearer_auth" = [])),
    tag = "obligations"
)]
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ListParams>,
) -> Json<Vec<FinancialObligation>> {
    Json(state.obligations.list(user, params.status))
}

/// POST /api/obligations — Record an obligation.
#[utoipa::path(
    post,
    path = "/api/obligations",
    request_body = CreateObligationRequest,
    responses(
        (status = 201, description = "Obligation recorded", body = FinancialObligation),
        (status = 422, description = "Bad amount, currency, or creditor", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "obligations"
)]
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateObligationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let amount = Money::parse(&req.amount, &req.currency)?;
    let obligation = state.obligations.create(
        user,
        &req.creditor_name,
        amount,
        req.description,
        req.due_date,
        state.now(),
    )?;
    persist(&state, &obligation).await;
    Ok((StatusCode::CREATED, Json(obligation)))
}

/// GET /api/obligations/:id — Fetch one obligation.
#[utoipa::path(
    get,
    path = "/api/obligations/{id}",
    params(("id" = Uuid, Path, description = "Obligation id")),
    responses(
        (status = 200, description = "The obligation", body = FinancialObligation),
        (status = 404, description = "No such obligation", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "obligations"
)]
pub async fn get_one(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<FinancialObligation>, AppError> {
    Ok(Json(state.obligations.get(user, ObligationId::from_uuid(id))?))
}

/// PUT /api/obligations/:id — Update an obligation.
#[utoipa::path(
    put,
    path = "/api/obligations/{id}",
    params(("id" = Uuid, Path, description = "Obligation id")),
    request_body = UpdateObligationRequest,
    responses(
        (status = 200, description = "Obligation updated", body = FinancialObligation),
        (status = 404, description = "No such obligation", body = crate::error::ErrorBody),
        (status = 422, description = "Bad amount or currency", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "obligations"
)]
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateObligationRequest>,
) -> Result<Json<FinancialObligation>, AppError> {
    let amount = match (&req.amount, &req.currency) {
        (Some(amount), Some(currency)) => Some(Money::parse(amount, currency)?),
        (None, None) => None,
        _ => {
            return Err(AppError::Validation(
                "amount and currency must be updated together".into(),
            ))
        }
    };
    let patch = ObligationPatch {
        creditor_name: req.creditor_name,
        amount,
        description: req.description,
        due_date: req.due_date,
    };
    let obligation =
        state
            .obligations
            .update(user, ObligationId::from_uuid(id), patch, state.now())?;
    persist(&state, &obligation).await;
    Ok(Json(obligation))
}

/// DELETE /api/obligations/:id — Delete an obligation.
#[utoipa::path(
    delete,
    path = "/api/obligations/{id}",
    params(("id" = Uuid, Path, description = "Obligation id")),
    responses(
        (status = 204, description = "Obligation deleted"),
        (status = 404, description = "No such obligation", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "obligations"
)]
pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let id = ObligationId::from_uuid(id);
    state.obligations.delete(user, id, state.now())?;
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::obligations::delete(pool, id).await {
            tracing::warn!(error = %e, obligation = %id, "failed to delete persisted obligation");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/obligations/:id/settle — Mark an obligation settled.
#[utoipa::path(
    post,
    path = "/api/obligations/{id}/settle",
    params(("id" = Uuid, Path, description = "Obligation id")),
    responses(
        (status = 200, description = "Obligation settled", body = FinancialObligation),
        (status = 404, description = "No such obligation", body = crate::error::ErrorBody),
        (status = 422, description = "Already settled", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "obligations"
)]
pub async fn settle(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<FinancialObligation>, AppError> {
    let obligation = state
        .obligations
        .settle(user, ObligationId::from_uuid(id), state.now())?;
    persist(&state, &obligation).await;
    Ok(Json(obligation))
}

/// GET /api/obligations/summary — Outstanding totals per currency.
#[utoipa::path(
    get,
    path = "/api/obligations/summary",
    responses((status = 200, description = "Summary", body = ObligationSummary)),
    security(("bearer_auth" = [])),
    tag = "obligations"
)]
pub async fn summary(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Json<ObligationSummary> {
    Json(state.obligations.summary(user))
}

async fn persist(state: &AppState, obligation: &FinancialObligation) {
    let Some(pool) = &state.db_pool else { return };
    if let Err(e) = crate::db::obligations::save(pool, obligation).await {
        tracing::warn!(error = %e, obligation = %obligation.id, "failed to persist obligation");
    }
}
