use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Problems with the per-request `X-DB-Config` header.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing database configuration")]
    Missing,
    #[error("Invalid database configuration format")]
    Malformed,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Validation(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Database error: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Config(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Config(e) => {
                tracing::warn!(error = %e, "rejected database configuration");
                e.to_string()
            }
            ApiError::Validation(msg) => {
                tracing::warn!(%msg, "validation error");
                msg.clone()
            }
            ApiError::MethodNotAllowed => self.to_string(),
            ApiError::Store(e) => {
                // driver text stays in the logs
                tracing::error!(error = %e, "store error");
                "Database error".to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Response for a handler that panicked; installed through `CatchPanicLayer`.
pub fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("request handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Server error" })),
    )
        .into_response()
}
