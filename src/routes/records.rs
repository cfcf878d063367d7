//! Request flow shared by payroll records, additional payments and leave
//! requests. Resource modules wrap these with their own paths and bodies.

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{can_view, permits, visible_records, Action, Principal, ResourceKind};
use crate::db::principals;
use crate::db::records::{self, StoredRecord};
use crate::errors::{AppError, AppResult};
use crate::events::{record_activity, Activity, RequestContext};
use crate::lifecycle::{self, lock::ensure_record_mutable};
use crate::models::StatusUpdateRequest;

fn kind_of<R: StoredRecord>() -> ResourceKind {
    R::spec().kind
}

pub(crate) fn require(principal: &Principal, kind: ResourceKind, action: Action) -> AppResult<()> {
    if permits(Some(principal), kind.capability_resource(), action) {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "missing {} permission on {}",
            action.as_str(),
            kind.capability_resource().as_str()
        )))
    }
}

async fn ensure_visible<R: StoredRecord>(state: &AppState, principal: &Principal, record: &R) -> AppResult<()> {
    let directory = principals::directory_for(&state.pool, record.owner_id()).await?;
    if can_view(Some(principal), kind_of::<R>(), record.owner_id(), &directory) {
        Ok(())
    } else {
        tracing::debug!(user_id = %principal.id, record_id = %record.id(), "record outside scope");
        Err(AppError::forbidden(format!("{} is outside your scope", R::NOUN)))
    }
}

pub async fn list<R: StoredRecord>(state: &AppState, principal: &Principal) -> AppResult<Vec<R>> {
    let candidates = records::fetch_all::<R>(&state.pool).await?;
    let directory = principals::directory(&state.pool).await?;
    Ok(visible_records(Some(principal), kind_of::<R>(), candidates, &directory))
}

pub async fn get<R: StoredRecord>(state: &AppState, principal: &Principal, id: Uuid) -> AppResult<R> {
    let record = records::fetch_one::<R>(&state.pool, id).await?;
    ensure_visible(state, principal, &record).await?;
    Ok(record)
}

/// New records may only be created for employees within the caller's scope.
pub async fn authorize_create(
    state: &AppState,
    principal: &Principal,
    kind: ResourceKind,
    employee_id: Uuid,
) -> AppResult<()> {
    require(principal, kind, Action::Create)?;

    if !principals::user_exists(&state.pool, employee_id).await? {
        return Err(AppError::validation("employee_id does not reference an active user"));
    }

    let directory = principals::directory_for(&state.pool, employee_id).await?;
    if !can_view(Some(principal), kind, employee_id, &directory) {
        return Err(AppError::forbidden("employee is outside your scope"));
    }
    Ok(())
}

/// Load a record for edit or delete: capability, scope and lock policy must all pass.
pub async fn load_mutable<R: StoredRecord>(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
    action: Action,
) -> AppResult<R> {
    require(principal, kind_of::<R>(), action)?;
    let record = get::<R>(state, principal, id).await?;
    ensure_record_mutable(&record)?;
    Ok(record)
}

pub async fn change_status<R: StoredRecord>(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
    body: AppResult<StatusUpdateRequest>,
    headers: &HeaderMap,
) -> AppResult<R> {
    let spec = R::spec();
    // Unreadable bodies (wrong types, missing content type) still answer with the vocabulary.
    let body = body.map_err(|err| {
        AppError::validation(format!(
            "{}; status must be one of: {}",
            err.public_message(),
            spec.vocabulary()
        ))
    })?;
    let target = body
        .status
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation(format!("status is required; must be one of: {}", spec.vocabulary())))?;
    spec.validate_status(&target)?;

    let record = get::<R>(state, principal, id).await?;
    lifecycle::authorize_target(spec, principal, record.owner_id(), &target)?;

    let patch = lifecycle::apply(&record, &target, principal, state.clock.as_ref())?;
    let updated = records::update_status::<R>(&state.pool, id, &patch).await?;

    tracing::info!(
        user_id = %principal.id,
        record_id = %id,
        kind = spec.kind.as_str(),
        from = %patch.from,
        to = %patch.status,
        "status changed"
    );

    record_activity(
        &state.event_bus,
        Activity::StatusChanged,
        Some(principal.id),
        &updated,
        Some(&record),
        Some(RequestContext::from_headers(headers)),
    );

    Ok(updated)
}

pub async fn remove<R: StoredRecord>(state: &AppState, principal: &Principal, id: Uuid, headers: &HeaderMap) -> AppResult<()> {
    let record = load_mutable::<R>(state, principal, id, Action::Delete).await?;
    records::delete(&state.pool, &record).await?;

    tracing::info!(user_id = %principal.id, record_id = %id, kind = R::spec().kind.as_str(), "record deleted");

    record_activity(
        &state.event_bus,
        Activity::Deleted,
        Some(principal.id),
        &record,
        None,
        Some(RequestContext::from_headers(headers)),
    );
    Ok(())
}

pub fn log_created<R: StoredRecord>(state: &AppState, principal: &Principal, record: &R, headers: &HeaderMap) {
    tracing::info!(user_id = %principal.id, record_id = %record.id(), kind = R::spec().kind.as_str(), "record created");
    record_activity(
        &state.event_bus,
        Activity::Created,
        Some(principal.id),
        record,
        None,
        Some(RequestContext::from_headers(headers)),
    );
}

pub fn log_updated<R: StoredRecord>(state: &AppState, principal: &Principal, record: &R, old: &R, headers: &HeaderMap) {
    tracing::info!(user_id = %principal.id, record_id = %record.id(), kind = R::spec().kind.as_str(), "record updated");
    record_activity(
        &state.event_bus,
        Activity::Updated,
        Some(principal.id),
        record,
        Some(old),
        Some(RequestContext::from_headers(headers)),
    );
}
