//! # Demo Release Endpoint
//!
//! `POST /demo/release` runs the real release pipeline — claim, decrypt,
//! dispatch through the live notifier, record — skipping only the overdue
//! check. Nothing about it is mocked: recipients receive real mail.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use vigil_core::ReleaseId;
use vigil_release::TriggerKind;
use vigil_state::{RecipientOutcome, ReleaseStatus};

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;

/// Outcome of a demo release.
#[derive(Debug, Serialize, ToSchema)]
pub struct DemoReleaseResponse {
    /// True only when the coordinator reached COMPLETED. A demo that
    /// failed before any send reports `false` via the error path instead.
    pub success: bool,
    pub release_id: ReleaseId,
    pub status: ReleaseStatus,
    pub days_overdue: u32,
    pub notifications: Vec<RecipientOutcome>,
}

/// Build the demo router.
pub fn router() -> Router<AppState> {
    Router::new().route("/demo/release", post(demo_release))
}

/// POST /demo/release — Fire the switch now, for real.
#[utoipa::path(
    post,
    path = "/demo/release",
    responses(
        (status = 200, description = "Release ran to a terminal state", body = DemoReleaseResponse),
        (status = 409, description = "A release is already pending or in progress", body = crate::error::ErrorBody),
        (status = 500, description = "Fatal pre-send failure", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "release"
)]
pub async fn demo_release(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<DemoReleaseResponse>, AppError> {
    let record = state.coordinator.trigger(user, TriggerKind::Demo).await?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::releases::save(pool, &record).await {
            tracing::warn!(error = %e, release = %record.id, "failed to persist release record");
        }
    }

    Ok(Json(DemoReleaseResponse {
        success: record.status == ReleaseStatus::Completed,
        release_id: record.id,
        status: record.status,
        days_overdue: record.days_overdue,
        notifications: record.outcomes,
    }))
}
