use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use catalog::Submission;
use tracing::instrument;
use uuid::Uuid;

use super::parse_id;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::machine::{
    MACHINE_FILE_FIELDS, MachineListResponse, MachineResponse, machine_create_form,
    machine_update_form,
};
use crate::models::shared::FormParts;
use crate::state::AppState;

/// Body limit for machine forms: an image and a video plus text fields.
pub fn machine_form_body_limit(max_object_size: u64) -> DefaultBodyLimit {
    let limit = max_object_size
        .saturating_mul(MACHINE_FILE_FIELDS.len() as u64)
        .saturating_add(1024 * 1024);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

#[utoipa::path(
    get,
    path = "/machines",
    tag = "Machines",
    operation_id = "listMachines",
    summary = "List all machines",
    description = "Every machine, newest first.",
    responses(
        (status = 200, description = "Machine list", body = MachineListResponse),
    ),
)]
#[instrument(skip(state))]
pub async fn list_machines(
    State(state): State<AppState>,
) -> Result<Json<MachineListResponse>, AppError> {
    Ok(Json(state.queries.machines().await?.into()))
}

#[utoipa::path(
    get,
    path = "/machines/featured",
    tag = "Machines",
    operation_id = "listFeaturedMachines",
    summary = "List featured machines",
    description = "The newest featured machines, capped at the configured featured limit.",
    responses(
        (status = 200, description = "Featured machines", body = MachineListResponse),
    ),
)]
#[instrument(skip(state))]
pub async fn list_featured_machines(
    State(state): State<AppState>,
) -> Result<Json<MachineListResponse>, AppError> {
    Ok(Json(state.queries.featured_machines().await?.into()))
}

#[utoipa::path(
    get,
    path = "/machines/{id}",
    tag = "Machines",
    operation_id = "getMachine",
    summary = "Get a machine",
    params(("id" = Uuid, Path, description = "Machine ID")),
    responses(
        (status = 200, description = "Machine details", body = MachineResponse),
        (status = 400, description = "Malformed ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Machine not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(machine_id = %id))]
pub async fn get_machine(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MachineResponse>, AppError> {
    let id = parse_id(&id)?;
    let machine = state
        .queries
        .machine(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Machine not found".into()))?;
    Ok(Json(machine.into()))
}

#[utoipa::path(
    get,
    path = "/admin/machines",
    tag = "Admin Machines",
    operation_id = "adminListMachines",
    summary = "List all machines for administration",
    responses(
        (status = 200, description = "Machine list", body = MachineListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn admin_list_machines(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MachineListResponse>, AppError> {
    Ok(Json(state.queries.admin_machines().await?.into()))
}

#[utoipa::path(
    post,
    path = "/admin/machines",
    tag = "Admin Machines",
    operation_id = "createMachine",
    summary = "Create a machine",
    description = "Text fields: `name` (required), `description`, `category` (defaults to \
        `General`), `technical_info`, `specifications` (JSON object of strings), `is_featured`. \
        Optional files: `image`, `video`. Files are uploaded before the record is saved; \
        if an upload fails nothing is saved.",
    request_body(content_type = "multipart/form-data", description = "Machine form"),
    responses(
        (status = 201, description = "Machine created", body = MachineResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 502, description = "Media upload failed (UPLOAD_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(admin = %auth_user.username))]
pub async fn create_machine(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let parts = FormParts::read(
        &mut multipart,
        MACHINE_FILE_FIELDS,
        state.config.storage.max_object_size,
    )
    .await?;
    let mut submission = Submission::new(machine_create_form(parts)?);
    let machine = state.workflow.submit_machine(&mut submission).await?;

    Ok((StatusCode::CREATED, Json(MachineResponse::from(machine))))
}

#[utoipa::path(
    patch,
    path = "/admin/machines/{id}",
    tag = "Admin Machines",
    operation_id = "updateMachine",
    summary = "Edit a machine",
    description = "Same fields as create. Absent fields are left unchanged; an empty optional \
        text field clears it. A new `image` or `video` replaces the stored URL; omitting \
        them keeps the current media.",
    params(("id" = Uuid, Path, description = "Machine ID")),
    request_body(content_type = "multipart/form-data", description = "Machine changes"),
    responses(
        (status = 200, description = "Machine updated", body = MachineResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Machine not found (NOT_FOUND)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 502, description = "Media upload failed (UPLOAD_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(admin = %auth_user.username, machine_id = %id))]
pub async fn update_machine(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<MachineResponse>, AppError> {
    let id = parse_id(&id)?;
    let parts = FormParts::read(
        &mut multipart,
        MACHINE_FILE_FIELDS,
        state.config.storage.max_object_size,
    )
    .await?;
    let mut submission = Submission::new(machine_update_form(id, parts)?);
    let machine = state.workflow.submit_machine(&mut submission).await?;

    Ok(Json(machine.into()))
}

#[utoipa::path(
    delete,
    path = "/admin/machines/{id}",
    tag = "Admin Machines",
    operation_id = "deleteMachine",
    summary = "Delete a machine",
    description = "Deletes the record immediately. Its media stays in storage until the next \
        orphan sweep.",
    params(("id" = Uuid, Path, description = "Machine ID")),
    responses(
        (status = 204, description = "Machine deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Machine not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(admin = %auth_user.username, machine_id = %id))]
pub async fn delete_machine(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    state.workflow.delete_machine(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
