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
use crate::lifecycle::{ReviewMeta, ADDITIONAL_PAYMENT};
use crate::models::additional_payment::{
    AdditionalPayment, AdditionalPaymentCreateRequest, AdditionalPaymentUpdateRequest,
};
use crate::models::StatusUpdateRequest;
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/additional-payments",
    tag = "Additional payments",
    responses((status = 200, description = "Additional payments visible to the caller", body = [AdditionalPayment])),
    security(("bearerAuth" = []))
)]
pub async fn list_additional_payments(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> AppResult<Json<Vec<AdditionalPayment>>> {
    Ok(Json(records::list::<AdditionalPayment>(&state, &principal).await?))
}

#[utoipa::path(
    get,
    path = "/additional-payments/{id}",
    tag = "Additional payments",
    params(("id" = Uuid, Path, description = "Additional payment id")),
    responses(
        (status = 200, description = "Additional payment", body = AdditionalPayment),
        (status = 404, description = "Additional payment not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_additional_payment(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AdditionalPayment>> {
    Ok(Json(records::get::<AdditionalPayment>(&state, &principal, id).await?))
}

#[utoipa::path(
    post,
    path = "/additional-payments",
    tag = "Additional payments",
    request_body = AdditionalPaymentCreateRequest,
    responses((status = 201, description = "Additional payment generated", body = AdditionalPayment)),
    security(("bearerAuth" = []))
)]
pub async fn create_additional_payment(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    headers: HeaderMap,
    AppJson(req): AppJson<AdditionalPaymentCreateRequest>,
) -> AppResult<(StatusCode, Json<AdditionalPayment>)> {
    req.validate()?;
    records::authorize_create(&state, &principal, ResourceKind::AdditionalPayment, req.employee_id).await?;

    let now = utc_now();
    let payment = AdditionalPayment {
        id: Uuid::new_v4(),
        employee_id: req.employee_id,
        amount: req.amount,
        reason: req.reason.trim().to_string(),
        payment_date: req.payment_date,
        status: ADDITIONAL_PAYMENT.initial.to_string(),
        review: ReviewMeta::default(),
        created_at: now,
        updated_at: now,
    };
    store::insert_additional_payment(&state.pool, &payment).await?;
    records::log_created(&state, &principal, &payment, &headers);

    Ok((StatusCode::CREATED, Json(payment)))
}

#[utoipa::path(
    put,
    path = "/additional-payments/{id}",
    tag = "Additional payments",
    params(("id" = Uuid, Path, description = "Additional payment id")),
    request_body = AdditionalPaymentUpdateRequest,
    responses(
        (status = 200, description = "Additional payment updated", body = AdditionalPayment),
        (status = 403, description = "Forbidden or record locked"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_additional_payment(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<AdditionalPaymentUpdateRequest>,
) -> AppResult<Json<AdditionalPayment>> {
    let current = records::load_mutable::<AdditionalPayment>(&state, &principal, id, Action::Edit).await?;
    let mut next = req.apply_to(&current)?;
    next.updated_at = utc_now();

    let updated = store::update_additional_payment(&state.pool, &next).await?;
    records::log_updated(&state, &principal, &updated, &current, &headers);
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/additional-payments/{id}",
    tag = "Additional payments",
    params(("id" = Uuid, Path, description = "Additional payment id")),
    responses(
        (status = 204, description = "Additional payment deleted"),
        (status = 403, description = "Forbidden or record locked"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_additional_payment(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    records::remove::<AdditionalPayment>(&state, &principal, id, &headers).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    patch,
    path = "/additional-payments/{id}/status",
    tag = "Additional payments",
    params(("id" = Uuid, Path, description = "Additional payment id")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Status changed", body = AdditionalPayment),
        (status = 400, description = "Missing or unknown status"),
        (status = 403, description = "Forbidden or terminal status"),
        (status = 404, description = "Additional payment not found"),
        (status = 409, description = "Status changed concurrently"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_additional_payment_status(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    body: Result<AppJson<StatusUpdateRequest>, AppError>,
) -> AppResult<Json<AdditionalPayment>> {
    let body = body.map(|AppJson(req)| req);
    Ok(Json(records::change_status::<AdditionalPayment>(&state, &principal, id, body, &headers).await?))
}
