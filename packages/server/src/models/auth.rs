use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Request body for administrator login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[schema(example = "admin")]
    pub username: String,
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.username.trim().is_empty() {
        return Err(AppError::Validation("Username must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

/// Successful login response. The same token is also set as the
/// `catalog_session` cookie.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// JWT bearer token.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    #[schema(example = "admin")]
    pub username: String,
    /// Token lifetime in seconds.
    #[schema(example = 86400)]
    pub expires_in: i64,
}

/// Current session.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MeResponse {
    #[schema(example = "admin")]
    pub username: String,
    /// Session expiry as a Unix timestamp.
    #[schema(example = 1767225600)]
    pub expires_at: u64,
}
