//! Rejection type for the admission extractors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use codebox_auth_core::AuthError;
use serde_json::json;

/// Admission failure rendered as `{"detail": "<reason>"}` with 401/403.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct GuardRejection(#[from] pub AuthError);

impl GuardRejection {
    /// HTTP status for this rejection.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match &self.0 {
            AuthError::Configuration(reason) => {
                tracing::error!(%reason, "admission misconfigured");
            }
            err => tracing::debug!(code = err.error_code(), "admission rejected"),
        }
        let body = json!({ "detail": self.0.detail() });
        (self.status(), Json(body)).into_response()
    }
}
