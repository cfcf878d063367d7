use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::Owned;
use crate::errors::{AppError, AppResult};
use crate::events::Loggable;
use crate::lifecycle::{LifecycleRecord, LifecycleSpec, ReviewMeta, PAYROLL};

/// Monthly payroll record. Amounts are in minor currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Payroll {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub period_month: i64,
    pub period_year: i64,
    pub base_salary: i64,
    pub allowances: i64,
    pub deductions: i64,
    pub net_salary: i64,
    pub notes: Option<String>,
    #[schema(example = "generated")]
    pub status: String,
    #[serde(flatten)]
    pub review: ReviewMeta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Payroll {
    fn owner_id(&self) -> Uuid {
        self.employee_id
    }
}

impl LifecycleRecord for Payroll {
    fn spec() -> &'static LifecycleSpec {
        &PAYROLL
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

impl Loggable for Payroll {
    fn entity_type() -> &'static str {
        "payroll"
    }
    fn entity_label() -> &'static str {
        "Payroll record"
    }
    fn subject_id(&self) -> Uuid {
        self.id
    }
    fn monetary() -> bool {
        true
    }
}

pub fn net_salary(base_salary: i64, allowances: i64, deductions: i64) -> AppResult<i64> {
    base_salary
        .checked_add(allowances)
        .and_then(|gross| gross.checked_sub(deductions))
        .ok_or_else(|| AppError::validation("salary components overflow"))
}

fn validate_components(period_month: i64, base_salary: i64, allowances: i64, deductions: i64) -> AppResult<()> {
    if !(1..=12).contains(&period_month) {
        return Err(AppError::validation("period_month must be between 1 and 12"));
    }
    if base_salary < 0 || allowances < 0 || deductions < 0 {
        return Err(AppError::validation("salary components must not be negative"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PayrollCreateRequest {
    pub employee_id: Uuid,
    #[schema(example = 3)]
    pub period_month: i64,
    #[schema(example = 2026)]
    pub period_year: i64,
    #[schema(example = 450000)]
    pub base_salary: i64,
    #[serde(default)]
    pub allowances: i64,
    #[serde(default)]
    pub deductions: i64,
    pub notes: Option<String>,
}

impl PayrollCreateRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_components(self.period_month, self.base_salary, self.allowances, self.deductions)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PayrollUpdateRequest {
    pub period_month: Option<i64>,
    pub period_year: Option<i64>,
    pub base_salary: Option<i64>,
    pub allowances: Option<i64>,
    pub deductions: Option<i64>,
    pub notes: Option<String>,
}

impl PayrollUpdateRequest {
    /// Apply the edit to a copy of `current`, recomputing the net salary.
    pub fn apply_to(&self, current: &Payroll) -> AppResult<Payroll> {
        let mut next = current.clone();
        if let Some(period_month) = self.period_month {
            next.period_month = period_month;
        }
        if let Some(period_year) = self.period_year {
            next.period_year = period_year;
        }
        if let Some(base_salary) = self.base_salary {
            next.base_salary = base_salary;
        }
        if let Some(allowances) = self.allowances {
            next.allowances = allowances;
        }
        if let Some(deductions) = self.deductions {
            next.deductions = deductions;
        }
        if let Some(notes) = &self.notes {
            next.notes = Some(notes.clone());
        }

        validate_components(next.period_month, next.base_salary, next.allowances, next.deductions)?;
        next.net_salary = net_salary(next.base_salary, next.allowances, next.deductions)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payroll() -> Payroll {
        Payroll {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            period_month: 1,
            period_year: 2026,
            base_salary: 1000,
            allowances: 200,
            deductions: 50,
            net_salary: 1150,
            notes: None,
            status: "generated".into(),
            review: ReviewMeta::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn edits_recompute_net_salary() {
        let edit = PayrollUpdateRequest { deductions: Some(300), ..Default::default() };
        let next = edit.apply_to(&payroll()).unwrap();
        assert_eq!(next.net_salary, 900);
    }

    #[test]
    fn rejects_out_of_range_month() {
        let edit = PayrollUpdateRequest { period_month: Some(13), ..Default::default() };
        assert!(matches!(edit.apply_to(&payroll()), Err(AppError::Validation(_))));
    }

    #[test]
    fn review_metadata_is_flattened_in_json() {
        let value = serde_json::to_value(payroll()).unwrap();
        assert!(value.get("reviewed_by").is_some());
        assert!(value.get("review").is_none());
    }
}
