//! Persistence for lifecycle records.
//!
//! Every write is conditioned on the status the caller last saw
//! (`WHERE id = ? AND status = ?`), so a record that moved underneath a
//! request is reported as a conflict instead of being overwritten.

use sqlx::sqlite::SqliteRow;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::row_parsers;
use crate::errors::{AppError, AppResult};
use crate::events::Loggable;
use crate::lifecycle::{LifecycleRecord, StatusPatch};
use crate::models::additional_payment::AdditionalPayment;
use crate::models::leave::LeaveRequest;
use crate::models::payroll::Payroll;

/// A lifecycle record stored in its own table.
pub trait StoredRecord: LifecycleRecord + Loggable + Sized {
    const TABLE: &'static str;
    /// Human name used in error messages.
    const NOUN: &'static str;

    fn from_row(row: &SqliteRow) -> AppResult<Self>;
}

impl StoredRecord for Payroll {
    const TABLE: &'static str = "payrolls";
    const NOUN: &'static str = "payroll record";

    fn from_row(row: &SqliteRow) -> AppResult<Self> {
        row_parsers::payroll_from_row(row)
    }
}

impl StoredRecord for AdditionalPayment {
    const TABLE: &'static str = "additional_payments";
    const NOUN: &'static str = "additional payment";

    fn from_row(row: &SqliteRow) -> AppResult<Self> {
        row_parsers::additional_payment_from_row(row)
    }
}

impl StoredRecord for LeaveRequest {
    const TABLE: &'static str = "leave_requests";
    const NOUN: &'static str = "leave request";

    fn from_row(row: &SqliteRow) -> AppResult<Self> {
        row_parsers::leave_from_row(row)
    }
}

pub async fn fetch_all<R: StoredRecord>(pool: &SqlitePool) -> AppResult<Vec<R>> {
    let sql = format!("SELECT * FROM {} ORDER BY created_at DESC", R::TABLE);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(R::from_row).collect()
}

pub async fn find<R: StoredRecord>(pool: &SqlitePool, id: Uuid) -> AppResult<Option<R>> {
    let sql = format!("SELECT * FROM {} WHERE id = ?", R::TABLE);
    let row = sqlx::query(&sql).bind(id.to_string()).fetch_optional(pool).await?;
    row.as_ref().map(R::from_row).transpose()
}

pub async fn fetch_one<R: StoredRecord>(pool: &SqlitePool, id: Uuid) -> AppResult<R> {
    find(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{} not found", R::NOUN)))
}

/// Explain why a conditional write touched no rows.
async fn stale<R: StoredRecord>(pool: &SqlitePool, id: Uuid, expected: &str) -> AppError {
    match find::<R>(pool, id).await {
        Ok(Some(current)) => AppError::conflict(format!(
            "{} changed concurrently: expected status {expected}, found {}",
            R::NOUN,
            current.status()
        )),
        Ok(None) => AppError::not_found(format!("{} not found", R::NOUN)),
        Err(err) => err,
    }
}

/// Persist a transition computed by the lifecycle engine, atomically with the
/// status the transition was computed from.
pub async fn update_status<R: StoredRecord>(pool: &SqlitePool, id: Uuid, patch: &StatusPatch) -> AppResult<R> {
    let sql = format!(
        "UPDATE {} SET status = ?, reviewed_by = ?, reviewed_at = ?, processed_by = ?, processed_at = ?, updated_at = ? \
         WHERE id = ? AND status = ?",
        R::TABLE
    );

    let result = sqlx::query(&sql)
        .bind(&patch.status)
        .bind(patch.review.reviewed_by.map(|u| u.to_string()))
        .bind(patch.review.reviewed_at.map(|t| t.to_rfc3339()))
        .bind(patch.review.processed_by.map(|u| u.to_string()))
        .bind(patch.review.processed_at.map(|t| t.to_rfc3339()))
        .bind(patch.updated_at.to_rfc3339())
        .bind(id.to_string())
        .bind(&patch.from)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(stale::<R>(pool, id, &patch.from).await);
    }

    fetch_one(pool, id).await
}

pub async fn delete<R: StoredRecord>(pool: &SqlitePool, record: &R) -> AppResult<()> {
    let sql = format!("DELETE FROM {} WHERE id = ? AND status = ?", R::TABLE);
    let result = sqlx::query(&sql)
        .bind(record.id().to_string())
        .bind(record.status())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(stale::<R>(pool, record.id(), record.status()).await);
    }
    Ok(())
}

fn map_unique(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::conflict(message.to_string()),
        _ => AppError::Database(err),
    }
}

pub async fn insert_payroll(pool: &SqlitePool, record: &Payroll) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO payrolls (id, employee_id, period_month, period_year, base_salary, allowances, deductions, net_salary, notes, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(record.id.to_string())
    .bind(record.employee_id.to_string())
    .bind(record.period_month)
    .bind(record.period_year)
    .bind(record.base_salary)
    .bind(record.allowances)
    .bind(record.deductions)
    .bind(record.net_salary)
    .bind(&record.notes)
    .bind(&record.status)
    .bind(record.created_at.to_rfc3339())
    .bind(record.updated_at.to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| map_unique(e, "payroll already exists for this employee and period"))?;
    Ok(())
}

pub async fn update_payroll(pool: &SqlitePool, record: &Payroll) -> AppResult<Payroll> {
    let result = sqlx::query(
        "UPDATE payrolls SET period_month = ?, period_year = ?, base_salary = ?, allowances = ?, deductions = ?, net_salary = ?, notes = ?, updated_at = ? \
         WHERE id = ? AND status = ?",
    )
    .bind(record.period_month)
    .bind(record.period_year)
    .bind(record.base_salary)
    .bind(record.allowances)
    .bind(record.deductions)
    .bind(record.net_salary)
    .bind(&record.notes)
    .bind(record.updated_at.to_rfc3339())
    .bind(record.id.to_string())
    .bind(&record.status)
    .execute(pool)
    .await
    .map_err(|e| map_unique(e, "payroll already exists for this employee and period"))?;

    if result.rows_affected() == 0 {
        return Err(stale::<Payroll>(pool, record.id, &record.status).await);
    }
    fetch_one(pool, record.id).await
}

pub async fn insert_additional_payment(pool: &SqlitePool, record: &AdditionalPayment) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO additional_payments (id, employee_id, amount, reason, payment_date, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(record.id.to_string())
    .bind(record.employee_id.to_string())
    .bind(record.amount)
    .bind(&record.reason)
    .bind(record.payment_date.to_string())
    .bind(&record.status)
    .bind(record.created_at.to_rfc3339())
    .bind(record.updated_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_additional_payment(pool: &SqlitePool, record: &AdditionalPayment) -> AppResult<AdditionalPayment> {
    let result = sqlx::query(
        "UPDATE additional_payments SET amount = ?, reason = ?, payment_date = ?, updated_at = ? WHERE id = ? AND status = ?",
    )
    .bind(record.amount)
    .bind(&record.reason)
    .bind(record.payment_date.to_string())
    .bind(record.updated_at.to_rfc3339())
    .bind(record.id.to_string())
    .bind(&record.status)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(stale::<AdditionalPayment>(pool, record.id, &record.status).await);
    }
    fetch_one(pool, record.id).await
}

pub async fn insert_leave(pool: &SqlitePool, record: &LeaveRequest) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO leave_requests (id, employee_id, leave_type, start_date, end_date, reason, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(record.id.to_string())
    .bind(record.employee_id.to_string())
    .bind(&record.leave_type)
    .bind(record.start_date.to_string())
    .bind(record.end_date.to_string())
    .bind(&record.reason)
    .bind(&record.status)
    .bind(record.created_at.to_rfc3339())
    .bind(record.updated_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_leave(pool: &SqlitePool, record: &LeaveRequest) -> AppResult<LeaveRequest> {
    let result = sqlx::query(
        "UPDATE leave_requests SET leave_type = ?, start_date = ?, end_date = ?, reason = ?, updated_at = ? WHERE id = ? AND status = ?",
    )
    .bind(&record.leave_type)
    .bind(record.start_date.to_string())
    .bind(record.end_date.to_string())
    .bind(&record.reason)
    .bind(record.updated_at.to_rfc3339())
    .bind(record.id.to_string())
    .bind(&record.status)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(stale::<LeaveRequest>(pool, record.id, &record.status).await);
    }
    fetch_one(pool, record.id).await
}
