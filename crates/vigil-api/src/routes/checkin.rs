//! # Check-in Endpoints
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `GET` | `/checkin/status` | `status` |
//! | `POST` | `/checkin/confirm` | `confirm` |
//! | `PUT` | `/checkin/config` | `configure` |
//!
//! Status and the release sweep share one evaluator, so the boundary a
//! user sees here is exactly the boundary the switch fires on.

use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use vigil_core::PresenceStatus;

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;

/// Request to reconfigure the inactivity window.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ConfigRequest {
    /// Whole days of allowed silence, 1..=730.
    pub interval_days: u32,
}

/// Build the check-in router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkin/status", get(status))
        .route("/checkin/confirm", post(confirm))
        .route("/checkin/config", put(configure))
}

/// GET /checkin/status — Where the user stands against their window.
#[utoipa::path(
    get,
    path = "/checkin/status",
    responses(
        (status = 200, description = "Presence status", body = PresenceStatus),
    ),
    security(("bearer_auth" = [])),
    tag = "checkin"
)]
pub async fn status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<PresenceStatus>, AppError> {
    let now = state.now();
    state.presence.ensure(user, now);
    Ok(Json(state.presence.status(user, now)?))
}

/// POST /checkin/confirm — Record a check-in now.
///
/// Resets the silence window and clears any PENDING release claim; an
/// IN_PROGRESS release is never cancelled.
#[utoipa::path(
    post,
    path = "/checkin/confirm",
    responses(
        (status = 200, description = "Check-in recorded", body = PresenceStatus),
    ),
    security(("bearer_auth" = [])),
    tag = "checkin"
)]
pub async fn confirm(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<PresenceStatus>, AppError> {
    let status = state.coordinator.record_checkin(user);
    persist_presence(&state, user).await;
    Ok(Json(status))
}

/// PUT /checkin/config — Reconfigure the inactivity window.
#[utoipa::path(
    put,
    path = "/checkin/config",
    request_body = ConfigRequest,
    responses(
        (status = 200, description = "Interval updated", body = PresenceStatus),
        (status = 422, description = "Interval out of bounds", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "checkin"
)]
pub async fn configure(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ConfigRequest>,
) -> Result<Json<PresenceStatus>, AppError> {
    let status = state
        .presence
        .set_interval(user, req.interval_days, state.now())?;
    persist_presence(&state, user).await;
    Ok(Json(status))
}

/// Mirror the user's presence record to the database, best-effort.
async fn persist_presence(state: &AppState, user: vigil_core::UserId) {
    let Some(pool) = &state.db_pool else { return };
    let Some(record) = state.presence.record(user) else {
        return;
    };
    if let Err(e) = crate::db::presence::save(pool, &record).await {
        tracing::warn!(error = %e, user = %user, "failed to persist presence record");
    }
}
