use std::time::Duration;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::Response;
use catalog::storage::ObjectPath;
use catalog::sweep_orphans;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::rejection::AppQuery;
use crate::models::storage::{DEFAULT_SWEEP_GRACE_SECS, SweepQuery, SweepResponse};
use crate::state::AppState;

/// Stream an uploaded object. This is the target of every media URL the
/// catalog stores.
#[instrument(skip(state))]
pub async fn serve_object(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let path =
        ObjectPath::parse(&path).map_err(|_| AppError::NotFound("Object not found".into()))?;
    let reader = state.objects.open(&path).await?;

    let mime = mime_guess::from_path(path.as_str()).first_or_octet_stream();

    Response::builder()
        .header(header::CONTENT_TYPE, mime.as_ref())
        // Object paths are never reused.
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .body(Body::from_stream(ReaderStream::new(reader)))
        .map_err(|e| AppError::Internal(e.to_string()))
}

#[utoipa::path(
    post,
    path = "/admin/storage/sweep",
    tag = "Admin Storage",
    operation_id = "sweepOrphans",
    summary = "Delete unreferenced media",
    description = "Deletes uploaded objects that no machine or customer references and that \
        are older than `grace_secs`. Younger objects are kept so uploads of in-flight \
        submissions are never collected.",
    params(SweepQuery),
    responses(
        (status = 200, description = "Sweep report", body = SweepResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(admin = %auth_user.username))]
pub async fn sweep_storage(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SweepQuery>,
) -> Result<Json<SweepResponse>, AppError> {
    let grace = Duration::from_secs(query.grace_secs.unwrap_or(DEFAULT_SWEEP_GRACE_SECS));
    let report = sweep_orphans(state.store.as_ref(), state.objects.as_ref(), grace).await?;
    Ok(Json(report.into()))
}
