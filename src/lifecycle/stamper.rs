use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{LifecycleSpec, ReviewMeta};
use crate::utils::utc_now;

/// Wall clock used when stamping transitions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        utc_now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Metadata newly set by a transition. Fields already present on the
/// record are never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditStamp {
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<Uuid>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl AuditStamp {
    pub fn is_empty(&self) -> bool {
        self.reviewed_by.is_none() && self.processed_by.is_none()
    }

    pub fn merge_into(&self, review: &mut ReviewMeta) {
        if let Some(actor) = self.reviewed_by {
            review.reviewed_by = Some(actor);
            review.reviewed_at = self.reviewed_at;
        }
        if let Some(actor) = self.processed_by {
            review.processed_by = Some(actor);
            review.processed_at = self.processed_at;
        }
    }
}

pub fn stamp(
    spec: &LifecycleSpec,
    prev_status: &str,
    new_status: &str,
    existing: &ReviewMeta,
    actor: Uuid,
    now: DateTime<Utc>,
) -> AuditStamp {
    let mut out = AuditStamp::default();

    let leaves_initial = prev_status == spec.initial && new_status != spec.initial;
    if leaves_initial && existing.reviewed_by.is_none() {
        out.reviewed_by = Some(actor);
        out.reviewed_at = Some(now);
    }

    if spec.is_finalizing(new_status) && existing.processed_by.is_none() {
        out.processed_by = Some(actor);
        out.processed_at = Some(now);
    }

    out
}
