//! Record lifecycle engine shared by payroll records, additional payments and
//! leave requests.
//!
//! Each record kind is described by a [`LifecycleSpec`]; the engine itself
//! knows nothing about individual kinds. The workflow is deliberately lenient:
//! any move is allowed while the source status is not terminal.

pub mod lock;
pub mod stamper;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::{permits, Action, Owned, Principal, ResourceKind};
use crate::errors::{AppError, AppResult};

pub use lock::ensure_mutable;
pub use stamper::{stamp, AuditStamp, Clock, FixedClock, SystemClock};

/// Status vocabulary and workflow shape of one record kind.
#[derive(Debug, PartialEq, Eq)]
pub struct LifecycleSpec {
    pub kind: ResourceKind,
    pub statuses: &'static [&'static str],
    pub initial: &'static str,
    pub terminal: &'static [&'static str],
    /// Statuses that conclude processing and stamp `processed_by`/`processed_at`.
    pub finalizing: &'static [&'static str],
    /// Statuses an owner may set on their own record without `approve`.
    pub self_service: &'static [&'static str],
}

pub const PAYROLL: LifecycleSpec = LifecycleSpec {
    kind: ResourceKind::Payroll,
    statuses: &["generated", "approved", "paid", "cancelled"],
    initial: "generated",
    terminal: &["paid", "cancelled"],
    finalizing: &["paid", "cancelled"],
    self_service: &[],
};

pub const ADDITIONAL_PAYMENT: LifecycleSpec = LifecycleSpec {
    kind: ResourceKind::AdditionalPayment,
    statuses: &["generated", "approved", "paid", "cancelled"],
    initial: "generated",
    terminal: &["paid", "cancelled"],
    finalizing: &["paid", "cancelled"],
    self_service: &[],
};

pub const LEAVE: LifecycleSpec = LifecycleSpec {
    kind: ResourceKind::Leave,
    statuses: &["requested", "approved", "rejected", "cancelled"],
    initial: "requested",
    terminal: &["approved", "rejected", "cancelled"],
    finalizing: &["approved", "rejected"],
    self_service: &["cancelled"],
};

pub fn spec_for(kind: ResourceKind) -> Option<&'static LifecycleSpec> {
    match kind {
        ResourceKind::Payroll => Some(&PAYROLL),
        ResourceKind::AdditionalPayment => Some(&ADDITIONAL_PAYMENT),
        ResourceKind::Leave => Some(&LEAVE),
        _ => None,
    }
}

impl LifecycleSpec {
    pub fn is_known(&self, status: &str) -> bool {
        self.statuses.contains(&status)
    }

    pub fn is_terminal(&self, status: &str) -> bool {
        self.terminal.contains(&status)
    }

    pub fn is_finalizing(&self, status: &str) -> bool {
        self.finalizing.contains(&status)
    }

    pub fn vocabulary(&self) -> String {
        self.statuses.join(", ")
    }

    pub fn validate_status(&self, status: &str) -> AppResult<()> {
        if self.is_known(status) {
            Ok(())
        } else {
            Err(AppError::validation(format!("status must be one of: {}", self.vocabulary())))
        }
    }
}

/// Review metadata carried by every lifecycle record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReviewMeta {
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<Uuid>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// A record governed by a [`LifecycleSpec`].
pub trait LifecycleRecord: Owned {
    fn spec() -> &'static LifecycleSpec;
    fn id(&self) -> Uuid;
    fn status(&self) -> &str;
    fn review(&self) -> &ReviewMeta;
}

/// Fields to persist for a successful transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPatch {
    pub from: String,
    pub status: String,
    pub review: ReviewMeta,
    pub stamp: AuditStamp,
    pub updated_at: DateTime<Utc>,
}

pub fn can_transition(spec: &LifecycleSpec, from: &str, to: &str) -> bool {
    spec.is_known(to) && !spec.is_terminal(from)
}

/// Validate and compute a transition of a record currently in `from`.
pub fn transition(
    spec: &LifecycleSpec,
    from: &str,
    review: &ReviewMeta,
    to: &str,
    actor: Uuid,
    clock: &dyn Clock,
) -> AppResult<StatusPatch> {
    spec.validate_status(to)?;

    if spec.is_terminal(from) {
        return Err(AppError::invalid_transition(format!(
            "{} record is already {from} and cannot become {to}",
            spec.kind.as_str()
        )));
    }

    let now = clock.now();
    let stamp = stamp(spec, from, to, review, actor, now);
    let mut merged = review.clone();
    stamp.merge_into(&mut merged);

    tracing::debug!(
        kind = spec.kind.as_str(),
        from = %from,
        to = %to,
        actor = %actor,
        stamped = !stamp.is_empty(),
        "transition accepted"
    );

    Ok(StatusPatch {
        from: from.to_string(),
        status: to.to_string(),
        review: merged,
        stamp,
        updated_at: now,
    })
}

pub fn apply<R: LifecycleRecord>(record: &R, to: &str, actor: &Principal, clock: &dyn Clock) -> AppResult<StatusPatch> {
    transition(R::spec(), record.status(), record.review(), to, actor.id, clock)
}

/// Gate on the target status: reviewers (`approve` on the governing
/// capability row) may set any status; everyone else may only move their
/// own record into the kind's self-service statuses.
pub fn authorize_target(spec: &LifecycleSpec, principal: &Principal, owner_id: Uuid, to: &str) -> AppResult<()> {
    if permits(Some(principal), spec.kind.capability_resource(), Action::Approve) {
        return Ok(());
    }

    if owner_id == principal.id && spec.self_service.contains(&to) {
        return Ok(());
    }

    Err(AppError::forbidden(format!(
        "not allowed to set {} status to {to}",
        spec.kind.as_str()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{Role, RoleName};
    use chrono::TimeZone;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap())
    }

    fn specs() -> [&'static LifecycleSpec; 3] {
        [&PAYROLL, &ADDITIONAL_PAYMENT, &LEAVE]
    }

    #[test]
    fn terminal_records_reject_every_target() {
        let actor = Uuid::new_v4();
        for spec in specs() {
            for from in spec.terminal {
                for to in spec.statuses {
                    assert!(!can_transition(spec, from, to));
                    let err = transition(spec, from, &ReviewMeta::default(), to, actor, &clock()).unwrap_err();
                    assert!(matches!(err, AppError::InvalidTransition(ref m) if m.contains(from)), "{err}");
                }
            }
        }
    }

    #[test]
    fn non_terminal_sources_may_move_anywhere_in_vocabulary() {
        for spec in specs() {
            for from in spec.statuses.iter().filter(|s| !spec.is_terminal(s)) {
                for to in spec.statuses {
                    assert!(can_transition(spec, from, to), "{from} -> {to}");
                }
            }
        }
    }

    #[test]
    fn unknown_target_lists_vocabulary() {
        let err = transition(&LEAVE, "requested", &ReviewMeta::default(), "archived", Uuid::new_v4(), &clock())
            .unwrap_err();

        match err {
            AppError::Validation(message) => {
                assert_eq!(message, "status must be one of: requested, approved, rejected, cancelled")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn vocabulary_check_precedes_terminal_check() {
        let err = transition(&PAYROLL, "paid", &ReviewMeta::default(), "archived", Uuid::new_v4(), &clock())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn approving_leave_stamps_review_and_processing_then_locks() {
        let manager = Uuid::new_v4();
        let patch = transition(&LEAVE, "requested", &ReviewMeta::default(), "approved", manager, &clock()).unwrap();

        assert_eq!(patch.status, "approved");
        assert_eq!(patch.review.reviewed_by, Some(manager));
        assert_eq!(patch.review.reviewed_at, Some(clock().0));
        assert_eq!(patch.review.processed_by, Some(manager));
        assert_eq!(patch.review.processed_at, Some(clock().0));

        let err = transition(&LEAVE, &patch.status, &patch.review, "cancelled", manager, &clock()).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[test]
    fn payroll_approval_only_stamps_review() {
        let actor = Uuid::new_v4();
        let approved = transition(&PAYROLL, "generated", &ReviewMeta::default(), "approved", actor, &clock()).unwrap();
        assert_eq!(approved.review.reviewed_by, Some(actor));
        assert_eq!(approved.review.processed_by, None);

        let payer = Uuid::new_v4();
        let paid = transition(&PAYROLL, "approved", &approved.review, "paid", payer, &clock()).unwrap();
        assert_eq!(paid.review.reviewed_by, Some(actor));
        assert_eq!(paid.review.processed_by, Some(payer));
    }

    #[test]
    fn employees_may_only_cancel_their_own_leave() {
        let employee = Principal::new(Uuid::new_v4(), Role::preset(RoleName::Employee));

        assert!(authorize_target(&LEAVE, &employee, employee.id, "cancelled").is_ok());
        assert!(matches!(
            authorize_target(&LEAVE, &employee, employee.id, "approved"),
            Err(AppError::Forbidden(_))
        ));
        assert!(authorize_target(&LEAVE, &employee, Uuid::new_v4(), "cancelled").is_err());
        assert!(authorize_target(&PAYROLL, &employee, employee.id, "paid").is_err());
    }

    #[test]
    fn reviewers_may_set_any_target() {
        let manager = Principal::new(Uuid::new_v4(), Role::preset(RoleName::Manager));
        assert!(authorize_target(&PAYROLL, &manager, Uuid::new_v4(), "paid").is_ok());
        assert!(authorize_target(&ADDITIONAL_PAYMENT, &manager, Uuid::new_v4(), "cancelled").is_ok());
    }

    #[test]
    fn only_record_kinds_have_lifecycles() {
        assert_eq!(spec_for(ResourceKind::Leave), Some(&LEAVE));
        assert_eq!(spec_for(ResourceKind::Inventory), None);
    }
}
