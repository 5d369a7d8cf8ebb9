use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use newsdesk_shared::NewsdeskError;
use serde::Serialize;

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

/// Handler error: a [`NewsdeskError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub NewsdeskError);

impl From<NewsdeskError> for ApiError {
    fn from(err: NewsdeskError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            NewsdeskError::Validation { .. } => StatusCode::BAD_REQUEST,
            NewsdeskError::NotFound(_) => StatusCode::NOT_FOUND,
            NewsdeskError::Conflict(_) => StatusCode::CONFLICT,
            NewsdeskError::Config { .. }
            | NewsdeskError::Storage(_)
            | NewsdeskError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };

        (
            status,
            Json(ErrorResponse {
                error,
                code: status.as_u16(),
            }),
        )
            .into_response()
    }
}
