//! Error handling for the axum surface.
//! Maps `EngineError` to HTTP status codes and JSON error bodies (§6).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use entity_types::EngineError;
use serde_json::json;

/// Wrapper to convert `EngineError` into an axum response.
pub struct AppError(EngineError);

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Version conflicts carry the caller's precondition and the
        // entity's current version alongside the error message (§8
        // scenario 2: `{currentVersion, expectedVersion}`).
        let body = match &self.0 {
            EngineError::VersionConflict { expected, current } => json!({
                "success": false,
                "error": self.0.to_string(),
                "expectedVersion": expected,
                "currentVersion": current,
            }),
            _ => json!({
                "success": false,
                "error": self.0.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}
