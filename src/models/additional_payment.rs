use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::Owned;
use crate::errors::{AppError, AppResult};
use crate::events::Loggable;
use crate::lifecycle::{LifecycleRecord, LifecycleSpec, ReviewMeta, ADDITIONAL_PAYMENT};

/// One-off payment (bonus, reimbursement) outside the monthly payroll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdditionalPayment {
    pub id: Uuid,
    pub employee_id: Uuid,
    #[schema(example = 25000)]
    pub amount: i64,
    #[schema(example = "Quarterly bonus")]
    pub reason: String,
    pub payment_date: NaiveDate,
    pub status: String,
    #[serde(flatten)]
    pub review: ReviewMeta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for AdditionalPayment {
    fn owner_id(&self) -> Uuid {
        self.employee_id
    }
}

impl LifecycleRecord for AdditionalPayment {
    fn spec() -> &'static LifecycleSpec {
        &ADDITIONAL_PAYMENT
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

impl Loggable for AdditionalPayment {
    fn entity_type() -> &'static str {
        "additional_payment"
    }
    fn entity_label() -> &'static str {
        "Additional payment"
    }
    fn subject_id(&self) -> Uuid {
        self.id
    }
    fn monetary() -> bool {
        true
    }
}

fn validate(amount: i64, reason: &str) -> AppResult<()> {
    if amount <= 0 {
        return Err(AppError::validation("amount must be greater than zero"));
    }
    if reason.trim().is_empty() {
        return Err(AppError::validation("reason is required"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdditionalPaymentCreateRequest {
    pub employee_id: Uuid,
    pub amount: i64,
    pub reason: String,
    pub payment_date: NaiveDate,
}

impl AdditionalPaymentCreateRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate(self.amount, &self.reason)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AdditionalPaymentUpdateRequest {
    pub amount: Option<i64>,
    pub reason: Option<String>,
    pub payment_date: Option<NaiveDate>,
}

impl AdditionalPaymentUpdateRequest {
    pub fn apply_to(&self, current: &AdditionalPayment) -> AppResult<AdditionalPayment> {
        let mut next = current.clone();
        if let Some(amount) = self.amount {
            next.amount = amount;
        }
        if let Some(reason) = &self.reason {
            next.reason = reason.trim().to_string();
        }
        if let Some(payment_date) = self.payment_date {
            next.payment_date = payment_date;
        }
        validate(next.amount, &next.reason)?;
        Ok(next)
    }
}
