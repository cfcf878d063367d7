use super::{LifecycleRecord, LifecycleSpec};
use crate::errors::{AppError, AppResult};

/// Reject edits and deletes of records in a terminal status.
pub fn ensure_mutable(spec: &LifecycleSpec, status: &str) -> AppResult<()> {
    if spec.is_terminal(status) {
        tracing::info!(kind = spec.kind.as_str(), status = %status, "mutation blocked by lock policy");
        return Err(AppError::forbidden(format!("cannot modify {status} record")));
    }
    Ok(())
}

pub fn ensure_record_mutable<R: LifecycleRecord>(record: &R) -> AppResult<()> {
    ensure_mutable(R::spec(), record.status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{ADDITIONAL_PAYMENT, LEAVE, PAYROLL};

    #[test]
    fn terminal_statuses_are_locked() {
        match ensure_mutable(&ADDITIONAL_PAYMENT, "paid") {
            Err(AppError::Forbidden(message)) => assert_eq!(message, "cannot modify paid record"),
            other => panic!("expected forbidden, got {other:?}"),
        }
        assert!(ensure_mutable(&PAYROLL, "cancelled").is_err());
        assert!(ensure_mutable(&LEAVE, "approved").is_err());
    }

    #[test]
    fn open_statuses_are_editable() {
        assert!(ensure_mutable(&PAYROLL, "generated").is_ok());
        assert!(ensure_mutable(&PAYROLL, "approved").is_ok());
        assert!(ensure_mutable(&LEAVE, "requested").is_ok());
    }
}
