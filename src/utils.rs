use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a UUID stored as TEXT.
pub fn parse_uuid(value: &str, column: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value.trim()).map_err(|err| AppError::internal(format!("invalid uuid in {column}: {err}")))
}

pub fn parse_optional_uuid(value: Option<String>, column: &str) -> Result<Option<Uuid>, AppError> {
    value.map(|v| parse_uuid(&v, column)).transpose()
}
