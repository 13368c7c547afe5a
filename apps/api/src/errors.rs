#![allow(dead_code)]

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::extract::ExtractError;
use crate::query::QueryError;

/// Success envelope. "Not found" on a single-record lookup is
/// `{success: true, data: null}` — a distinct channel from failures, which
/// go through [`AppError`] as `{success: false, error: {..}}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
        }
    }

    pub fn empty() -> Self {
        ApiResponse {
            success: true,
            data: None,
        }
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Query(e) => match e {
                QueryError::Precondition(msg) => {
                    (StatusCode::BAD_REQUEST, "PRECONDITION_ERROR", msg.clone())
                }
                QueryError::InvalidIdentifier(ident) => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    format!("invalid identifier '{ident}'"),
                ),
                QueryError::Execution(msg) => {
                    tracing::error!("Query execution error: {msg}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "QUERY_EXECUTION_ERROR",
                        "A database error occurred".to_string(),
                    )
                }
                QueryError::Decode(e) => {
                    tracing::error!("Row decode error: {e}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "QUERY_EXECUTION_ERROR",
                        "A database error occurred".to_string(),
                    )
                }
            },
            AppError::Extract(e) => {
                tracing::error!("Extraction error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EXTRACTION_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
