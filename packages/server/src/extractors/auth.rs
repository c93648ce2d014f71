use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Name of the HTTP-only cookie carrying the admin session token.
pub const SESSION_COOKIE: &str = "catalog_session";

/// Authenticated administrator.
///
/// Read from `Authorization: Bearer <token>`, falling back to the session
/// cookie set by login. Add this as a handler parameter to require a session.
pub struct AuthUser {
    pub username: String,
    /// Expiry of the presented token, as a Unix timestamp.
    pub expires_at: usize,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match parts.headers.get("Authorization") {
            Some(value) => {
                let value = value.to_str().map_err(|_| AppError::TokenInvalid)?;
                value
                    .strip_prefix("Bearer ")
                    .ok_or(AppError::TokenInvalid)?
                    .to_string()
            }
            None => CookieJar::from_headers(&parts.headers)
                .get(SESSION_COOKIE)
                .map(|c| c.value().to_string())
                .ok_or(AppError::TokenMissing)?,
        };

        let claims = jwt::verify(&token, &state.config.auth.jwt_secret)
            .map_err(|_| AppError::TokenInvalid)?;

        if claims.sub != state.config.auth.admin_username {
            return Err(AppError::TokenInvalid);
        }

        Ok(AuthUser {
            username: claims.sub,
            expires_at: claims.exp,
        })
    }
}
