//! Blob Store error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Messages
//! returned to clients are generic; underlying causes are logged server-side.

use crate::storage::StorageError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Value of the `WWW-Authenticate` header sent with every 401.
pub const WWW_AUTHENTICATE_VALUE: &str = "Bearer realm=\"coatlocker\", error=\"invalid_token\"";

/// Blob Store error type.
///
/// Maps to HTTP status codes:
/// - InvalidToken: 401 Unauthorized
/// - NotFound: 404 Not Found
/// - AlreadyExists: 422 Unprocessable Entity
/// - Storage, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum LockerError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Blob not found")]
    NotFound,

    #[error("Blob already exists")]
    AlreadyExists,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error")]
    Internal,
}

impl LockerError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            LockerError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            LockerError::NotFound => StatusCode::NOT_FOUND,
            LockerError::AlreadyExists => StatusCode::UNPROCESSABLE_ENTITY,
            LockerError::Storage(_) | LockerError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for LockerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message) = match &self {
            LockerError::InvalidToken(reason) => ("INVALID_TOKEN", reason.clone()),
            LockerError::NotFound => ("NOT_FOUND", "Blob not found".to_string()),
            LockerError::AlreadyExists => ("ALREADY_EXISTS", "Blob already exists".to_string()),
            LockerError::Storage(err) => {
                tracing::error!(target: "locker.storage", error = %err, "Storage operation failed");
                (
                    "STORAGE_ERROR",
                    "An internal storage error occurred".to_string(),
                )
            }
            LockerError::Internal => ("INTERNAL_ERROR", "An internal error occurred".to_string()),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(WWW_AUTHENTICATE_VALUE),
            );
        }

        response
    }
}

impl From<StorageError> for LockerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => LockerError::NotFound,
            StorageError::AlreadyExists => LockerError::AlreadyExists,
            StorageError::Io(e) => LockerError::Storage(e.to_string()),
        }
    }
}
