//! HTTP error mapping.
//!
//! Every failure leaves the gateway as `{"message": "..."}` with one of four
//! statuses. Internal details are logged, never returned.

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cconnector_core::ClaimError;
use serde_json::json;
use thiserror::Error;

use crate::engine::EngineError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request has invalid format: `{0}`")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Entity cannot be processed because of: `{0}`")]
    Unprocessable(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "message": self.to_string() }))).into_response()
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound(message) | EngineError::Conflict(message) => {
                Self::Unprocessable(message)
            }
            EngineError::Rejected(message) => Self::BadRequest(message),
            other => {
                tracing::error!(error = %other, "container engine request failed");
                Self::Internal
            }
        }
    }
}

impl From<ClaimError> for ApiError {
    fn from(err: ClaimError) -> Self {
        match err {
            ClaimError::EmptyManagerToken => Self::BadRequest(err.to_string()),
            ClaimError::AlreadyClaimed => Self::Unprocessable(err.to_string()),
            other => {
                tracing::error!(error = %other, "claim failed");
                Self::Internal
            }
        }
    }
}
