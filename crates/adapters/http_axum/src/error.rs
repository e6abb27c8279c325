//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use comfortzone_domain::error::{ComfortError, ValidationError};

/// JSON error body returned by every endpoint.
#[derive(Serialize)]
pub(crate) struct ErrorBody {
    pub(crate) error: String,
}

impl ErrorBody {
    pub(crate) fn response(status: StatusCode, message: impl Into<String>) -> Response {
        (
            status,
            Json(Self {
                error: message.into(),
            }),
        )
            .into_response()
    }
}

/// Maps [`ComfortError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(ComfortError);

impl From<ComfortError> for ApiError {
    fn from(err: ComfortError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(ComfortError::Validation(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            ComfortError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ComfortError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            ComfortError::Storage(err) => {
                tracing::error!(error = %err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            ComfortError::Hardware(_) | ComfortError::Transport(_) => {
                tracing::error!(error = %self.0, "unexpected error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        ErrorBody::response(status, message)
    }
}
