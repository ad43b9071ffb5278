//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the Bearer token security scheme to the OpenAPI spec.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Bearer access token obtained from POST /auth/login.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vigil API",
        version = "0.3.2",
        description = "Dead-man's-switch legacy vault.\n\nProvides:\n- **Check-in** presence tracking with a configurable inactivity window\n- **Encrypted legacy vault** of items assigned to trusted recipients\n- **Release engine** that decrypts and delivers the vault when the owner goes silent, with a dry-run simulation and a live demo trigger\n- **Financial obligations** surfaced to recipients on release\n- **Trusted person** designation with out-of-band email verification\n- **Relationship journal** with state indicators\n\nAuthentication: Bearer token via `Authorization: Bearer <token>` header. Health probes, `/metrics`, `/openapi.json`, and the verification link redemption endpoint are unauthenticated.",
        license(name = "AGPL-3.0-or-later"),
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        // ── Auth ─────────────────────────────────────────────────────────
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::me,
        // ── Check-in ─────────────────────────────────────────────────────
        crate::routes::checkin::status,
        crate::routes::checkin::confirm,
        crate::routes::checkin::configure,
        // ── Legacy vault ─────────────────────────────────────────────────
        crate::routes::legacy::list_recipients,
        crate::routes::legacy::create_recipient,
        crate::routes::legacy::update_recipient,
        crate::routes::legacy::delete_recipient,
        crate::routes::legacy::list_items,
        crate::routes::legacy::create_item,
        crate::routes::legacy::update_item,
        crate::routes::legacy::delete_item,
        crate::routes::legacy::simulate_release,
        // ── Release ──────────────────────────────────────────────────────
        crate::routes::demo::demo_release,
        // ── Obligations ──────────────────────────────────────────────────
        crate::routes::obligations::list,
        crate::routes::obligations::create,
        crate::routes::obligations::get_one,
        crate::routes::obligations::update,
        crate::routes::obligations::delete,
        crate::routes::obligations::settle,
        crate::routes::obligations::summary,
        // ── Trusted person ───────────────────────────────────────────────
        crate::routes::trusted_person::get_one,
        crate::routes::trusted_person::create,
        crate::routes::trusted_person::update,
        crate::routes::trusted_person::delete,
        crate::routes::trusted_person::start_verification,
        crate::routes::trusted_person::redeem_token,
        // ── Relationships ────────────────────────────────────────────────
        crate::routes::relationships::list,
        crate::routes::relationships::create,
        crate::routes::relationships::get_one,
        crate::routes::relationships::update,
        crate::routes::relationships::delete,
    ),
    components(
        schemas(
            // ── Error types ─────────────────────────────────────────────
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            // ── Auth DTOs ───────────────────────────────────────────────
            crate::routes::auth::RegisterRequest,
            crate::routes::auth::LoginForm,
            crate::routes::auth::TokenResponse,
            crate::routes::auth::UserResponse,
            // ── Check-in DTOs ───────────────────────────────────────────
            crate::routes::checkin::ConfigRequest,
            vigil_core::PresenceStatus,
            // ── Legacy vault DTOs ───────────────────────────────────────
            crate::routes::legacy::CreateRecipientRequest,
            crate::routes::legacy::UpdateRecipientRequest,
            crate::routes::legacy::CreateItemRequest,
            crate::routes::legacy::UpdateItemRequest,
            vigil_state::Recipient,
            vigil_state::ItemSummary,
            vigil_release::SimulationReport,
            vigil_release::SimulatedDelivery,
            // ── Release DTOs ────────────────────────────────────────────
            crate::routes::demo::DemoReleaseResponse,
            vigil_state::ReleaseStatus,
            vigil_state::RecipientOutcome,
            // ── Obligation DTOs ─────────────────────────────────────────
            crate::routes::obligations::CreateObligationRequest,
            crate::routes::obligations::UpdateObligationRequest,
            vigil_state::FinancialObligation,
            vigil_state::Money,
            vigil_state::ObligationStatus,
            vigil_state::ObligationSummary,
            // ── Trusted person DTOs ─────────────────────────────────────
            crate::routes::trusted_person::CreateTrustedContactRequest,
            crate::routes::trusted_person::UpdateTrustedContactRequest,
            vigil_state::TrustedContact,
            vigil_state::VerificationStatus,
            // ── Relationship DTOs ───────────────────────────────────────
            crate::routes::relationships::CreateRelationshipRequest,
            crate::routes::relationships::UpdateRelationshipRequest,
            crate::routes::relationships::RelationshipResponse,
            vigil_state::Relationship,
            vigil_state::RelationshipState,
        ),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Account registration, login, and the current user"),
        (name = "checkin", description = "Presence check-ins and the inactivity window"),
        (name = "legacy", description = "Encrypted legacy vault — recipients, items, and the release dry run"),
        (name = "release", description = "Demo release trigger — runs the real pipeline on demand"),
        (name = "obligations", description = "Financial obligations surfaced to recipients on release"),
        (name = "trusted-person", description = "Trusted contact designation and email verification"),
        (name = "relationships", description = "Relationship journal with state indicators"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_generates_successfully() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Vigil API");
        assert_eq!(spec.info.version, "0.3.2");
    }

    #[test]
    fn spec_has_checkin_paths() {
        let spec = ApiDoc::openapi();
        assert!(spec.paths.paths.contains_key("/checkin/status"));
        assert!(spec.paths.paths.contains_key("/checkin/confirm"));
        assert!(spec.paths.paths.contains_key("/checkin/config"));
    }

    #[test]
    fn spec_has_legacy_paths() {
        let spec = ApiDoc::openapi();
        assert!(spec.paths.paths.contains_key("/legacy/recipient"));
        assert!(spec.paths.paths.contains_key("/legacy/recipient/{id}"));
        assert!(spec.paths.paths.contains_key("/legacy/"));
        assert!(spec.paths.paths.contains_key("/legacy/{id}"));
        assert!(spec.paths.paths.contains_key("/legacy/simulate-release"));
        assert!(spec.paths.paths.contains_key("/demo/release"));
    }

    #[test]
    fn spec_has_obligation_paths() {
        let spec = ApiDoc::openapi();
        assert!(spec.paths.paths.contains_key("/api/obligations"));
        assert!(spec.paths.paths.contains_key("/api/obligations/{id}/settle"));
        assert!(spec.paths.paths.contains_key("/api/obligations/summary"));
    }

    #[test]
    fn spec_has_trusted_person_paths() {
        let spec = ApiDoc::openapi();
        assert!(spec.paths.paths.contains_key("/api/trusted-person"));
        assert!(spec.paths.paths.contains_key("/api/trusted-person/verify"));
        assert!(spec
            .paths
            .paths
            .contains_key("/api/trusted-person/verify/{token}"));
    }

    #[test]
    fn spec_has_key_schemas() {
        let spec = ApiDoc::openapi();
        let schemas = &spec.components.as_ref().unwrap().schemas;
        for name in &[
            "PresenceStatus",
            "Recipient",
            "ItemSummary",
            "SimulationReport",
            "DemoReleaseResponse",
            "FinancialObligation",
            "ObligationSummary",
            "TrustedContact",
            "RelationshipResponse",
            "ErrorBody",
        ] {
            assert!(schemas.contains_key(*name), "should contain {name} schema");
        }
    }

    #[test]
    fn spec_has_security_scheme() {
        let spec = ApiDoc::openapi();
        let components = spec.components.as_ref().unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn spec_serializes_to_json() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("bearer_auth"));
    }
}
