//! HTTP mapping for service errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use nexus_core::NexusError;
use nexus_presence_sdk::ErrorResponse;

/// Handler error wrapper; renders `{success: false, message, code}`
#[derive(Debug)]
pub struct ApiError(pub NexusError);

impl From<NexusError> for ApiError {
    fn from(err: NexusError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if self.0.is_internal() {
            tracing::error!("Internal error: {:?}", self.0);
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            code: self.0.error_code().to_string(),
        });

        (status, body).into_response()
    }
}
