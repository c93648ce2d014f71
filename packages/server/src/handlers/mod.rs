pub mod auth;
pub mod customer;
pub mod machine;
pub mod storage;

use uuid::Uuid;

use crate::error::AppError;

/// Parse a record ID path segment.
fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::Validation("Invalid ID".into()))
}
