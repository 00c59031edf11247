use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use insight::InsightError;
use records::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid username or password")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(detail) => AppError::Conflict(detail),
            other => AppError::InternalError(Box::new(other)),
        }
    }
}

impl From<InsightError> for AppError {
    fn from(e: InsightError) -> Self {
        match e {
            InsightError::Store(e) => e.into(),
            InsightError::NotFound(what) => AppError::NotFound(what),
            InsightError::InvalidWindow(detail) => AppError::BadRequest(detail),
            InsightError::OutOfScope => AppError::Forbidden(InsightError::OutOfScope.to_string()),
            other => AppError::InternalError(Box::new(other)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MalformedPayload | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalError(ref e) => {
                error!("{e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
