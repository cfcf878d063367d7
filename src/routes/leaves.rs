use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use uuid::Uuid;

use super::records;
use crate::app::AppState;
use crate::authz::{Action, ResourceKind};
use crate::db::records as store;
use crate::errors::{AppError, AppResult};
use crate::extract::AppJson;
use crate::jwt::CurrentPrincipal;
use crate::lifecycle::{ReviewMeta, LEAVE};
use crate::models::leave::{LeaveCreateRequest, LeaveRequest, LeaveUpdateRequest};
use crate::models::StatusUpdateRequest;
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/leaves",
    tag = "Leave",
    responses((status = 200, description = "Leave requests visible to the caller", body = [LeaveRequest])),
    security(("bearerAuth" = []))
)]
pub async fn list_leaves(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> AppResult<Json<Vec<LeaveRequest>>> {
    Ok(Json(records::list::<LeaveRequest>(&state, &principal).await?))
}

#[utoipa::path(
    get,
    path = "/leaves/{id}",
    tag = "Leave",
    params(("id" = Uuid, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Leave request", body = LeaveRequest),
        (status = 404, description = "Leave request not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_leave(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LeaveRequest>> {
    Ok(Json(records::get::<LeaveRequest>(&state, &principal, id).await?))
}

/// Employees file leave for themselves; reviewers may file on behalf of
/// anyone in scope.
#[utoipa::path(
    post,
    path = "/leaves",
    tag = "Leave",
    request_body = LeaveCreateRequest,
    responses((status = 201, description = "Leave requested", body = LeaveRequest)),
    security(("bearerAuth" = []))
)]
pub async fn create_leave(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    headers: HeaderMap,
    AppJson(req): AppJson<LeaveCreateRequest>,
) -> AppResult<(StatusCode, Json<LeaveRequest>)> {
    req.validate()?;
    let employee_id = req.employee_id.unwrap_or(principal.id);
    records::authorize_create(&state, &principal, ResourceKind::Leave, employee_id).await?;

    let now = utc_now();
    let leave = LeaveRequest {
        id: Uuid::new_v4(),
        employee_id,
        leave_type: req.leave_type,
        start_date: req.start_date,
        end_date: req.end_date,
        reason: req.reason,
        status: LEAVE.initial.to_string(),
        review: ReviewMeta::default(),
        created_at: now,
        updated_at: now,
    };
    store::insert_leave(&state.pool, &leave).await?;
    records::log_created(&state, &principal, &leave, &headers);

    Ok((StatusCode::CREATED, Json(leave)))
}

#[utoipa::path(
    put,
    path = "/leaves/{id}",
    tag = "Leave",
    params(("id" = Uuid, Path, description = "Leave request id")),
    request_body = LeaveUpdateRequest,
    responses(
        (status = 200, description = "Leave request updated", body = LeaveRequest),
        (status = 403, description = "Forbidden or record locked"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_leave(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<LeaveUpdateRequest>,
) -> AppResult<Json<LeaveRequest>> {
    let current = records::load_mutable::<LeaveRequest>(&state, &principal, id, Action::Edit).await?;
    let mut next = req.apply_to(&current)?;
    next.updated_at = utc_now();

    let updated = store::update_leave(&state.pool, &next).await?;
    records::log_updated(&state, &principal, &updated, &current, &headers);
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/leaves/{id}",
    tag = "Leave",
    params(("id" = Uuid, Path, description = "Leave request id")),
    responses(
        (status = 204, description = "Leave request deleted"),
        (status = 403, description = "Forbidden or record locked"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_leave(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    records::remove::<LeaveRequest>(&state, &principal, id, &headers).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    patch,
    path = "/leaves/{id}/status",
    tag = "Leave",
    params(("id" = Uuid, Path, description = "Leave request id")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Status changed", body = LeaveRequest),
        (status = 400, description = "Missing or unknown status"),
        (status = 403, description = "Forbidden or terminal status"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Status changed concurrently"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_leave_status(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    body: Result<AppJson<StatusUpdateRequest>, AppError>,
) -> AppResult<Json<LeaveRequest>> {
    let body = body.map(|AppJson(req)| req);
    Ok(Json(records::change_status::<LeaveRequest>(&state, &principal, id, body, &headers).await?))
}
