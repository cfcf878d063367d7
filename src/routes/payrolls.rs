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
use crate::lifecycle::{ReviewMeta, PAYROLL};
use crate::models::payroll::{net_salary, Payroll, PayrollCreateRequest, PayrollUpdateRequest};
use crate::models::StatusUpdateRequest;
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/payrolls",
    tag = "Payroll",
    responses((status = 200, description = "Payroll records visible to the caller", body = [Payroll])),
    security(("bearerAuth" = []))
)]
pub async fn list_payrolls(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> AppResult<Json<Vec<Payroll>>> {
    Ok(Json(records::list::<Payroll>(&state, &principal).await?))
}

#[utoipa::path(
    get,
    path = "/payrolls/{id}",
    tag = "Payroll",
    params(("id" = Uuid, Path, description = "Payroll id")),
    responses(
        (status = 200, description = "Payroll record", body = Payroll),
        (status = 403, description = "Outside the caller's scope"),
        (status = 404, description = "Payroll not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_payroll(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Payroll>> {
    Ok(Json(records::get::<Payroll>(&state, &principal, id).await?))
}

#[utoipa::path(
    post,
    path = "/payrolls",
    tag = "Payroll",
    request_body = PayrollCreateRequest,
    responses(
        (status = 201, description = "Payroll generated", body = Payroll),
        (status = 409, description = "Payroll already exists for the period"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_payroll(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    headers: HeaderMap,
    AppJson(req): AppJson<PayrollCreateRequest>,
) -> AppResult<(StatusCode, Json<Payroll>)> {
    req.validate()?;
    records::authorize_create(&state, &principal, ResourceKind::Payroll, req.employee_id).await?;

    let now = utc_now();
    let payroll = Payroll {
        id: Uuid::new_v4(),
        employee_id: req.employee_id,
        period_month: req.period_month,
        period_year: req.period_year,
        base_salary: req.base_salary,
        allowances: req.allowances,
        deductions: req.deductions,
        net_salary: net_salary(req.base_salary, req.allowances, req.deductions)?,
        notes: req.notes,
        status: PAYROLL.initial.to_string(),
        review: ReviewMeta::default(),
        created_at: now,
        updated_at: now,
    };
    store::insert_payroll(&state.pool, &payroll).await?;
    records::log_created(&state, &principal, &payroll, &headers);

    Ok((StatusCode::CREATED, Json(payroll)))
}

#[utoipa::path(
    put,
    path = "/payrolls/{id}",
    tag = "Payroll",
    params(("id" = Uuid, Path, description = "Payroll id")),
    request_body = PayrollUpdateRequest,
    responses(
        (status = 200, description = "Payroll updated", body = Payroll),
        (status = 403, description = "Forbidden or record locked"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_payroll(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<PayrollUpdateRequest>,
) -> AppResult<Json<Payroll>> {
    let current = records::load_mutable::<Payroll>(&state, &principal, id, Action::Edit).await?;
    let mut next = req.apply_to(&current)?;
    next.updated_at = utc_now();

    let updated = store::update_payroll(&state.pool, &next).await?;
    records::log_updated(&state, &principal, &updated, &current, &headers);
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/payrolls/{id}",
    tag = "Payroll",
    params(("id" = Uuid, Path, description = "Payroll id")),
    responses(
        (status = 204, description = "Payroll deleted"),
        (status = 403, description = "Forbidden or record locked"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_payroll(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    records::remove::<Payroll>(&state, &principal, id, &headers).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    patch,
    path = "/payrolls/{id}/status",
    tag = "Payroll",
    params(("id" = Uuid, Path, description = "Payroll id")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Status changed", body = Payroll),
        (status = 400, description = "Missing or unknown status"),
        (status = 403, description = "Forbidden or terminal status"),
        (status = 404, description = "Payroll not found"),
        (status = 409, description = "Status changed concurrently"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_payroll_status(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    body: Result<AppJson<StatusUpdateRequest>, AppError>,
) -> AppResult<Json<Payroll>> {
    let body = body.map(|AppJson(req)| req);
    Ok(Json(records::change_status::<Payroll>(&state, &principal, id, body, &headers).await?))
}
