//! JSON error responses of the management endpoints.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::error::{codes, PileError};

/// Body of every failed management request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub error_code: u32,
}

/// A [`PileError`] on its way to the client.
#[derive(Debug)]
pub struct ApiError(pub PileError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            PileError::Validation { .. } => StatusCode::BAD_REQUEST,
            PileError::NotFound(_) => StatusCode::NOT_FOUND,
            PileError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PileError::Render(_) => StatusCode::BAD_GATEWAY,
            PileError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn missing_body() -> Self {
        Self(PileError::validation(
            codes::MISSING_BODY,
            "Please provide a request body",
        ))
    }
}

impl From<PileError> for ApiError {
    fn from(err: PileError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self.0, status = status.as_u16(), "Management request failed");
        }
        let body = ErrorBody {
            error: self.0.to_string(),
            error_code: self.0.error_code(),
        };
        (status, Json(body)).into_response()
    }
}
