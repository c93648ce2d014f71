use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AuthUser, SESSION_COOKIE};
use crate::extractors::rejection::AppJson;
use crate::models::auth::{LoginRequest, LoginResponse, MeResponse, validate_login_request};
use crate::state::AppState;
use crate::utils::{hash, jwt};

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Handle administrator login.
#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in as the administrator",
    description = "Checks the credentials against the configured administrator account. \
        Returns a bearer token and sets the same token as an HTTP-only session cookie.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Wrong username or password (INVALID_CREDENTIALS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, jar, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    validate_login_request(&payload)?;

    let auth = &state.config.auth;
    let username = payload.username.trim();
    if username != auth.admin_username {
        return Err(AppError::InvalidCredentials);
    }

    let is_valid = hash::verify_password(&payload.password, &auth.admin_password_hash)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;
    if !is_valid {
        tracing::warn!("Rejected administrator login");
        return Err(AppError::InvalidCredentials);
    }

    let token = jwt::sign(username, &auth.jwt_secret, auth.token_ttl_hours)
        .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;
    tracing::info!("Administrator logged in");

    Ok((
        jar.add(session_cookie(token.clone())),
        Json(LoginResponse {
            token,
            username: username.to_string(),
            expires_in: auth.token_ttl_hours * 3600,
        }),
    ))
}

/// Clear the session cookie.
#[utoipa::path(
    post,
    path = "/logout",
    tag = "Auth",
    operation_id = "logout",
    summary = "Log out",
    description = "Removes the session cookie. Bearer tokens stay valid until they expire.",
    responses((status = 204, description = "Logged out")),
)]
#[instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let removal = Cookie::build(SESSION_COOKIE).path("/");
    (jar.remove(removal), StatusCode::NO_CONTENT)
}

/// Return the current session.
#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    operation_id = "me",
    summary = "Current administrator session",
    responses(
        (status = 200, description = "Session info", body = MeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user), fields(username = %auth_user.username))]
pub async fn me(auth_user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        username: auth_user.username,
        expires_at: auth_user.expires_at as u64,
    })
}
