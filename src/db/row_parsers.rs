use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Decode, Row, Sqlite, Type};
use uuid::Uuid;

use crate::errors::AppError;
use crate::lifecycle::ReviewMeta;
use crate::models::additional_payment::AdditionalPayment;
use crate::models::leave::LeaveRequest;
use crate::models::payroll::Payroll;
use crate::utils::{parse_optional_uuid, parse_uuid};

pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, AppError> {
    let s = s.trim();

    // RFC3339 is what we write (e.g. 2026-01-19T12:34:56Z)
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // SQLite default timestamp format: "YYYY-MM-DD HH:MM:SS"
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    Err(AppError::internal(format!("invalid datetime: {}", s)))
}

fn parse_opt_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, AppError> {
    match s {
        Some(s) if !s.trim().is_empty() => Ok(Some(parse_datetime(&s)?)),
        _ => Ok(None),
    }
}

pub fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| AppError::internal(format!("invalid date {}: {}", s, e)))
}

fn col<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, AppError>
where
    T: Decode<'r, Sqlite> + Type<Sqlite>,
{
    row.try_get(name).map_err(|e| AppError::internal(format!("missing {}: {}", name, e)))
}

pub fn uuid_col(row: &SqliteRow, name: &str) -> Result<Uuid, AppError> {
    let s: String = col(row, name)?;
    parse_uuid(&s, name)
}

fn review_from_row(row: &SqliteRow) -> Result<ReviewMeta, AppError> {
    Ok(ReviewMeta {
        reviewed_by: parse_optional_uuid(col(row, "reviewed_by")?, "reviewed_by")?,
        reviewed_at: parse_opt_datetime(col(row, "reviewed_at")?)?,
        processed_by: parse_optional_uuid(col(row, "processed_by")?, "processed_by")?,
        processed_at: parse_opt_datetime(col(row, "processed_at")?)?,
    })
}

fn timestamps(row: &SqliteRow) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let created_at: String = col(row, "created_at")?;
    let updated_at: String = col(row, "updated_at")?;
    Ok((parse_datetime(&created_at)?, parse_datetime(&updated_at)?))
}

pub fn payroll_from_row(row: &SqliteRow) -> Result<Payroll, AppError> {
    let (created_at, updated_at) = timestamps(row)?;

    Ok(Payroll {
        id: uuid_col(row, "id")?,
        employee_id: uuid_col(row, "employee_id")?,
        period_month: col(row, "period_month")?,
        period_year: col(row, "period_year")?,
        base_salary: col(row, "base_salary")?,
        allowances: col(row, "allowances")?,
        deductions: col(row, "deductions")?,
        net_salary: col(row, "net_salary")?,
        notes: col(row, "notes")?,
        status: col(row, "status")?,
        review: review_from_row(row)?,
        created_at,
        updated_at,
    })
}

pub fn additional_payment_from_row(row: &SqliteRow) -> Result<AdditionalPayment, AppError> {
    let (created_at, updated_at) = timestamps(row)?;
    let payment_date: String = col(row, "payment_date")?;

    Ok(AdditionalPayment {
        id: uuid_col(row, "id")?,
        employee_id: uuid_col(row, "employee_id")?,
        amount: col(row, "amount")?,
        reason: col(row, "reason")?,
        payment_date: parse_date(&payment_date)?,
        status: col(row, "status")?,
        review: review_from_row(row)?,
        created_at,
        updated_at,
    })
}

pub fn leave_from_row(row: &SqliteRow) -> Result<LeaveRequest, AppError> {
    let (created_at, updated_at) = timestamps(row)?;
    let start_date: String = col(row, "start_date")?;
    let end_date: String = col(row, "end_date")?;

    Ok(LeaveRequest {
        id: uuid_col(row, "id")?,
        employee_id: uuid_col(row, "employee_id")?,
        leave_type: col(row, "leave_type")?,
        start_date: parse_date(&start_date)?,
        end_date: parse_date(&end_date)?,
        reason: col(row, "reason")?,
        status: col(row, "status")?,
        review: review_from_row(row)?,
        created_at,
        updated_at,
    })
}
