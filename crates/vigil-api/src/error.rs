// SPDX-License-Identifier: AGPL-3.0-or-later
//! # API Error Types
//!
//! One error enum for the whole HTTP surface, with a deterministic mapping
//! to status codes and a structured JSON body. Internal error detail is
//! logged and redacted; clients see a stable code and a safe message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use vigil_core::ValidationError;
use vigil_notify::NotifyError;
use vigil_release::ReleaseError;
use vigil_state::StoreError;

/// Application-level errors, mapped onto HTTP responses by `IntoResponse`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Input failed validation (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// The requested entity does not exist for this caller (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// The request conflicts with current state (409): a release already
    /// pending or in progress, or a unique constraint already taken.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Missing or invalid credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The mail relay is not configured or unreachable where dispatch is
    /// mandatory (503).
    #[error("mail relay unavailable: {0}")]
    RelayUnavailable(String),

    /// Anything the caller cannot act on (500). The message is logged,
    /// never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The status code and stable error code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::RelayUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "RELAY_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

/// Structured error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// The error payload inside [`ErrorBody`].
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Stable machine-readable code (e.g. `NOT_FOUND`).
    pub code: String,
    /// Human-readable message. Safe for clients: internal detail is
    /// redacted before it gets here.
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status.is_server_error() {
            tracing::error!(code, error = %self, "request failed with server error");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(entity) => Self::NotFound(entity.to_string()),
            StoreError::Validation(v) => Self::Validation(v.to_string()),
            StoreError::AlreadyInProgress => Self::Conflict(err.to_string()),
            StoreError::AlreadySettled => Self::Validation(err.to_string()),
            StoreError::EmailTaken => Self::Conflict(err.to_string()),
            StoreError::AlreadyExists(_) => Self::Conflict(err.to_string()),
            // Transition bugs and crypto failures are internal: the
            // envelope format and the state machine are not client concerns.
            StoreError::InvalidTransition { .. } | StoreError::Crypto(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<ReleaseError> for AppError {
    fn from(err: ReleaseError) -> Self {
        match err {
            ReleaseError::Store(store) => store.into(),
            ReleaseError::NotOverdue { .. } => Self::Forbidden(err.to_string()),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<NotifyError> for AppError {
    fn from(err: NotifyError) -> Self {
        Self::RelayUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_maps_to_422_with_message() {
        let (status, body) =
            response_parts(AppError::Validation("title must not be empty".into())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("title"));
    }

    #[tokio::test]
    async fn internal_message_is_redacted() {
        let (status, body) =
            response_parts(AppError::Internal("decryption failed: key id 7".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(body["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn claim_conflict_maps_to_409() {
        let (status, body) = response_parts(StoreError::AlreadyInProgress.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn already_settled_maps_to_422() {
        let (status, _) = response_parts(StoreError::AlreadySettled.into()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn not_overdue_maps_to_403() {
        let err = ReleaseError::NotOverdue {
            days_since: Some(3),
            interval_days: 30,
        };
        let (status, body) = response_parts(err.into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("not overdue"));
    }

    #[tokio::test]
    async fn crypto_failure_is_internal_and_redacted() {
        let err: AppError =
            StoreError::Crypto(vigil_crypto::CryptoError::DecryptionFailed).into();
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn missing_relay_maps_to_503() {
        let err: AppError = NotifyError::RelayNotConfigured.into();
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "RELAY_UNAVAILABLE");
    }

    #[test]
    fn not_found_keeps_entity_name() {
        let err: AppError = StoreError::NotFound("vault item").into();
        assert_eq!(format!("{err}"), "not found: vault item");
    }
}
