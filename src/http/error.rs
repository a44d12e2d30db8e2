use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::domain::aggregates::CartError;
use crate::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Too many requests, try again later")]
    RateLimited,
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self { Self::BadRequest(err.to_string()) }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Cart(CartError::ProductNotFound(_) | CartError::LineNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Cart(CartError::OutOfStock { .. } | CartError::InsufficientStock { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Cart(CartError::InvalidQuantity) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Cart(CartError::Unauthorized) => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Cart(CartError::Store(_)) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = json!({"error": status.canonical_reason().unwrap_or("Error"), "message": message});
        (status, Json(body)).into_response()
    }
}
