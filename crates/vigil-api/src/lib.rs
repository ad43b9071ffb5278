//! # vigil-api — Axum API Services for Vigil
//!
//! Vigil is a dead-man's-switch legacy vault: users check in on a
//! schedule, and when they go silent past their window, the release
//! engine decrypts their vault and delivers it to their recipients.
//!
//! ## API Surface
//!
//! | Prefix                  | Module                        | Domain              |
//! |-------------------------|-------------------------------|---------------------|
//! | `/auth/*`               | [`routes::auth`]              | Accounts and tokens |
//! | `/checkin/*`            | [`routes::checkin`]           | Presence            |
//! | `/legacy/*`             | [`routes::legacy`]            | Vault and dry run   |
//! | `/demo/release`         | [`routes::demo`]              | Live demo trigger   |
//! | `/api/obligations/*`    | [`routes::obligations`]       | Financial obligations |
//! | `/api/trusted-person/*` | [`routes::trusted_person`]    | Trusted contact     |
//! | `/relationships/*`      | [`routes::relationships`]     | Relationship journal |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler (auth via extractor)
//! ```
//!
//! ## OpenAPI
//!
//! Auto-generated spec via utoipa derive macros at `/openapi.json`.

pub mod auth;
pub mod db;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Check if metrics are enabled via the `VIGIL_METRICS_ENABLED` env var.
/// Defaults to `true` when the variable is absent or set to anything other
/// than `"false"`.
fn metrics_enabled() -> bool {
    std::env::var("VIGIL_METRICS_ENABLED")
        .map(|v| v.to_lowercase() != "false")
        .unwrap_or(true)
}

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`), `/metrics`, `/openapi.json`, and the
/// trusted-contact verification link are mounted without the bearer-token
/// requirement; everything else authenticates through the `CurrentUser`
/// extractor.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        jwt_secret: state.config.jwt_secret.clone(),
    };
    let metrics = ApiMetrics::new();
    let metrics_on = metrics_enabled();

    // Authenticated API routes.
    //
    // Body size limit: 2 MiB. Vault item content is the largest payload and
    // anything bigger belongs in external storage, not an email.
    let mut api = Router::new()
        .merge(routes::auth::router())
        .merge(routes::checkin::router())
        .merge(routes::legacy::router())
        .merge(routes::demo::router())
        .merge(routes::obligations::router())
        .merge(routes::trusted_person::router())
        .merge(routes::relationships::router())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024));

    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .layer(Extension(auth_config))
        .with_state(state.clone());

    // Unauthenticated surface: health probes, metrics scrape, OpenAPI, and
    // the verification link the trusted contact follows from their inbox.
    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .merge(openapi::router())
        .merge(routes::trusted_person::public_router());

    if metrics_on {
        unauthenticated = unauthenticated
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics — Prometheus metrics scrape endpoint.
///
/// Refreshes domain gauges from current `AppState` on each scrape (pull
/// model), then encodes everything in text exposition format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    metrics.update_domain_gauges(&state);
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics.gather_and_encode(),
    )
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the application is ready to serve traffic.
///
/// Checks that the stores answer and, when a pool is configured, that the
/// database responds. Returns 200 "ready" or 503 with a diagnostic.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let _ = state.users.count();
    let _ = state.releases.snapshot().len();

    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
