use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::Owned;
use crate::errors::{AppError, AppResult};
use crate::events::Loggable;
use crate::lifecycle::{LifecycleRecord, LifecycleSpec, ReviewMeta, LEAVE};

pub const LEAVE_TYPES: &[&str] = &["annual", "sick", "unpaid", "other"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveRequest {
    pub id: Uuid,
    pub employee_id: Uuid,
    #[schema(example = "annual")]
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
    #[schema(example = "requested")]
    pub status: String,
    #[serde(flatten)]
    pub review: ReviewMeta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for LeaveRequest {
    fn owner_id(&self) -> Uuid {
        self.employee_id
    }
}

impl LifecycleRecord for LeaveRequest {
    fn spec() -> &'static LifecycleSpec {
        &LEAVE
    }
    fn id(&self) -> Uuid {
        self.id
    }
    fn status(&self) -> &str {
        &self.status
    }
    fn review(&self) -> &ReviewMeta {
        &self.review
    }
}

impl Loggable for LeaveRequest {
    fn entity_type() -> &'static str {
        "leave_request"
    }
    fn entity_label() -> &'static str {
        "Leave request"
    }
    fn subject_id(&self) -> Uuid {
        self.id
    }
}

fn validate(leave_type: &str, start_date: NaiveDate, end_date: NaiveDate) -> AppResult<()> {
    if !LEAVE_TYPES.contains(&leave_type) {
        return Err(AppError::validation(format!("leave_type must be one of: {}", LEAVE_TYPES.join(", "))));
    }
    if end_date < start_date {
        return Err(AppError::validation("end_date must not be before start_date"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LeaveCreateRequest {
    /// Defaults to the caller.
    pub employee_id: Option<Uuid>,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

impl LeaveCreateRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate(&self.leave_type, self.start_date, self.end_date)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LeaveUpdateRequest {
    pub leave_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
}

impl LeaveUpdateRequest {
    pub fn apply_to(&self, current: &LeaveRequest) -> AppResult<LeaveRequest> {
        let mut next = current.clone();
        if let Some(leave_type) = &self.leave_type {
            next.leave_type = leave_type.clone();
        }
        if let Some(start_date) = self.start_date {
            next.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            next.end_date = end_date;
        }
        if let Some(reason) = &self.reason {
            next.reason = Some(reason.clone());
        }
        validate(&next.leave_type, next.start_date, next.end_date)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, day).unwrap()
    }

    #[test]
    fn end_before_start_is_invalid() {
        let req = LeaveCreateRequest {
            employee_id: None,
            leave_type: "annual".into(),
            start_date: date(10),
            end_date: date(9),
            reason: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn unknown_leave_type_lists_allowed_values() {
        let req = LeaveCreateRequest {
            employee_id: None,
            leave_type: "sabbatical".into(),
            start_date: date(1),
            end_date: date(2),
            reason: None,
        };
        match req.validate() {
            Err(AppError::Validation(m)) => assert!(m.contains("annual, sick, unpaid, other")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn partial_edit_keeps_untouched_fields() {
        let now = Utc::now();
        let current = LeaveRequest {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            leave_type: "annual".into(),
            start_date: date(1),
            end_date: date(3),
            reason: Some("trip".into()),
            status: "requested".into(),
            review: ReviewMeta::default(),
            created_at: now,
            updated_at: now,
        };

        let edit = LeaveUpdateRequest {
            end_date: Some(date(5)),
            ..Default::default()
        };
        let next = edit.apply_to(&current).unwrap();
        assert_eq!(next.end_date, date(5));
        assert_eq!(next.start_date, date(1));
        assert_eq!(next.leave_type, "annual");
        assert_eq!(next.reason.as_deref(), Some("trip"));

        let backwards = LeaveUpdateRequest {
            start_date: Some(date(9)),
            ..Default::default()
        };
        assert!(matches!(backwards.apply_to(&current), Err(AppError::Validation(_))));
    }
}
