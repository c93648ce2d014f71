use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use catalog::storage::StorageError;
use catalog::{CatalogError, FetchError, StoreError};
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `INVALID_CREDENTIALS`, `NOT_FOUND`, `PAYLOAD_TOO_LARGE`,
    /// `UPLOAD_FAILED`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Machine name is required")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    NotFound(String),
    PayloadTooLarge(String),
    /// Media could not be written to object storage.
    UploadFailed(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_MISSING",
                    message: "Authentication required".into(),
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    message: "Invalid or expired token".into(),
                },
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "INVALID_CREDENTIALS",
                    message: "Invalid username or password".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorBody {
                    code: "PAYLOAD_TOO_LARGE",
                    message: msg,
                },
            ),
            AppError::UploadFailed(detail) => {
                tracing::error!("Upload failed: {}", detail);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorBody {
                        code: "UPLOAD_FAILED",
                        message: "Media upload failed, nothing was saved".into(),
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, .. } => {
                AppError::NotFound(format!("{} not found", capitalize(kind.as_str())))
            }
            StoreError::Backend(detail) => AppError::Internal(detail),
        }
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match err.source {
            StoreError::Backend(detail) => {
                AppError::Internal(format!("failed to load {}: {detail}", err.key))
            }
            other => AppError::from(other),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => AppError::NotFound("Object not found".into()),
            StorageError::InvalidPath(msg) => AppError::Validation(msg),
            StorageError::SizeLimitExceeded { actual, limit } => AppError::PayloadTooLarge(
                format!("Object is {actual} bytes, the limit is {limit} bytes"),
            ),
            StorageError::Io(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation { message, .. } => AppError::Validation(message),
            CatalogError::Upload(StorageError::SizeLimitExceeded { actual, limit }) => {
                AppError::PayloadTooLarge(format!(
                    "File is {actual} bytes, the limit is {limit} bytes"
                ))
            }
            CatalogError::Upload(e) => AppError::UploadFailed(e.to_string()),
            CatalogError::Storage(e) => AppError::Internal(format!("object storage: {e}")),
            CatalogError::Persistence(e) => AppError::from(e),
            CatalogError::Fetch(e) => AppError::from(e),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
