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
use crate::models::customer::{
    CUSTOMER_FILE_FIELDS, CustomerListResponse, CustomerResponse, customer_create_form,
    customer_update_form,
};
use crate::models::shared::FormParts;
use crate::state::AppState;

pub fn customer_form_body_limit(max_object_size: u64) -> DefaultBodyLimit {
    let limit = max_object_size.saturating_add(1024 * 1024);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

#[utoipa::path(
    get,
    path = "/customers",
    tag = "Customers",
    operation_id = "listCustomers",
    summary = "List showcased customers",
    description = "Featured customers, newest first.",
    responses(
        (status = 200, description = "Customer list", body = CustomerListResponse),
    ),
)]
#[instrument(skip(state))]
pub async fn list_customers(
    State(state): State<AppState>,
) -> Result<Json<CustomerListResponse>, AppError> {
    Ok(Json(state.queries.customers().await?.into()))
}

#[utoipa::path(
    get,
    path = "/admin/customers",
    tag = "Admin Customers",
    operation_id = "adminListCustomers",
    summary = "List all customers for administration",
    responses(
        (status = 200, description = "Customer list", body = CustomerListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn admin_list_customers(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<CustomerListResponse>, AppError> {
    Ok(Json(state.queries.admin_customers().await?.into()))
}

#[utoipa::path(
    post,
    path = "/admin/customers",
    tag = "Admin Customers",
    operation_id = "createCustomer",
    summary = "Create a customer",
    description = "Text fields: `name` (required), `description`, `is_featured` (defaults to \
        true). Optional file: `logo`, uploaded before the record is saved.",
    request_body(content_type = "multipart/form-data", description = "Customer form"),
    responses(
        (status = 201, description = "Customer created", body = CustomerResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 502, description = "Logo upload failed (UPLOAD_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(admin = %auth_user.username))]
pub async fn create_customer(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let parts = FormParts::read(
        &mut multipart,
        CUSTOMER_FILE_FIELDS,
        state.config.storage.max_object_size,
    )
    .await?;
    let mut submission = Submission::new(customer_create_form(parts)?);
    let customer = state.workflow.submit_customer(&mut submission).await?;

    Ok((StatusCode::CREATED, Json(CustomerResponse::from(customer))))
}

#[utoipa::path(
    patch,
    path = "/admin/customers/{id}",
    tag = "Admin Customers",
    operation_id = "updateCustomer",
    summary = "Edit a customer",
    description = "Absent fields are left unchanged; an empty `description` clears it. \
        A new `logo` replaces the stored URL.",
    params(("id" = Uuid, Path, description = "Customer ID")),
    request_body(content_type = "multipart/form-data", description = "Customer changes"),
    responses(
        (status = 200, description = "Customer updated", body = CustomerResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Customer not found (NOT_FOUND)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 502, description = "Logo upload failed (UPLOAD_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(admin = %auth_user.username, customer_id = %id))]
pub async fn update_customer(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<CustomerResponse>, AppError> {
    let id = parse_id(&id)?;
    let parts = FormParts::read(
        &mut multipart,
        CUSTOMER_FILE_FIELDS,
        state.config.storage.max_object_size,
    )
    .await?;
    let mut submission = Submission::new(customer_update_form(id, parts)?);
    let customer = state.workflow.submit_customer(&mut submission).await?;

    Ok(Json(customer.into()))
}

#[utoipa::path(
    delete,
    path = "/admin/customers/{id}",
    tag = "Admin Customers",
    operation_id = "deleteCustomer",
    summary = "Delete a customer",
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 204, description = "Customer deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Customer not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(admin = %auth_user.username, customer_id = %id))]
pub async fn delete_customer(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    state.workflow.delete_customer(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
