use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::core::CalcError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid parameter: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("No tax rules for plan year {0}")]
    UnknownYear(u16),

    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    Calc(#[from] CalcError),
}

impl ApiError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnknownYear(_) | ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Calc(CalcError::UnsupportedYear(_)) => StatusCode::NOT_FOUND,
            ApiError::Validation { .. } | ApiError::Malformed(_) | ApiError::Calc(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::warn!(status = status.as_u16(), error = %self, "request rejected");

        let body = Json(json!({
            "error": self.to_string(),
        }));
        (status, [(header::CACHE_CONTROL, "no-store")], body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
