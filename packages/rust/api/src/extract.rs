use axum::extract::{FromRequest, rejection::JsonRejection};
use newsdesk_shared::NewsdeskError;

use crate::error::ApiError;

/// `Json` body extractor whose rejections use the API error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(NewsdeskError::validation(format!(
            "invalid request body: {}",
            rejection.body_text()
        )))
    }
}
