//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use purchase::{FailureKind, PurchaseError};
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request that never reached the purchase core.
    #[error("{0}")]
    BadRequest(String),

    /// Error raised by stock administration or a purchase.
    #[error(transparent)]
    Purchase(#[from] PurchaseError),
}

impl ApiError {
    /// Returns the failure kind reported in the response body.
    pub fn kind(&self) -> FailureKind {
        match self {
            ApiError::BadRequest(_) => FailureKind::InvalidArgument,
            ApiError::Purchase(err) => err.kind(),
        }
    }

    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self.kind() {
            FailureKind::InvalidArgument => StatusCode::BAD_REQUEST,
            FailureKind::ProductNotFound => StatusCode::NOT_FOUND,
            FailureKind::InsufficientInventory => StatusCode::UNPROCESSABLE_ENTITY,
            FailureKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            FailureKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(%status, %kind, error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": message, "kind": kind.as_str() });
        (status, axum::Json(body)).into_response()
    }
}
