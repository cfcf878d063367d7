//! Writes are conditional on the status the caller last read; a record that
//! moved underneath them answers 409 and is left untouched.

mod common;

use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use paydesk::authz::RoleName;
use paydesk::db::records;
use paydesk::errors::AppError;
use paydesk::lifecycle::{self, FixedClock, ReviewMeta, LEAVE};
use paydesk::models::additional_payment::AdditionalPayment;
use paydesk::models::leave::LeaveRequest;

/// Simulate a concurrent writer.
async fn force_status(db: &common::TestDb, table: &str, id: Uuid, status: &str) -> Result<()> {
    sqlx::query(&format!("UPDATE {table} SET status = ? WHERE id = ?"))
        .bind(status)
        .bind(id.to_string())
        .execute(&db.pool)
        .await?;
    Ok(())
}

#[tokio::test]
async fn status_update_against_a_moved_record_conflicts() -> Result<()> {
    let db = common::test_db().await?;
    let employee = db.user(RoleName::Employee, &[]).await?;
    let reviewer = db.user(RoleName::Manager, &[]).await?;
    let leave = db.leave(employee, "requested").await?;

    let patch = lifecycle::transition(&LEAVE, "requested", &ReviewMeta::default(), "rejected", reviewer, &FixedClock(Utc::now()))?;
    force_status(&db, "leave_requests", leave, "approved").await?;

    let err = records::update_status::<LeaveRequest>(&db.pool, leave, &patch).await.unwrap_err();
    match err {
        AppError::Conflict(message) => {
            assert!(message.contains("expected status requested"), "{message}");
            assert!(message.contains("found approved"), "{message}");
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    let stored = records::fetch_one::<LeaveRequest>(&db.pool, leave).await?;
    assert_eq!(stored.status, "approved");
    assert_eq!(stored.review, ReviewMeta::default());
    Ok(())
}

#[tokio::test]
async fn status_update_on_a_deleted_record_is_not_found() -> Result<()> {
    let db = common::test_db().await?;
    let employee = db.user(RoleName::Employee, &[]).await?;
    let leave = db.leave(employee, "requested").await?;
    let patch = lifecycle::transition(&LEAVE, "requested", &ReviewMeta::default(), "cancelled", employee, &FixedClock(Utc::now()))?;

    sqlx::query("DELETE FROM leave_requests WHERE id = ?")
        .bind(leave.to_string())
        .execute(&db.pool)
        .await?;

    let err = records::update_status::<LeaveRequest>(&db.pool, leave, &patch).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "{err:?}");
    Ok(())
}

#[tokio::test]
async fn delete_of_a_stale_record_conflicts_and_keeps_the_row() -> Result<()> {
    let db = common::test_db().await?;
    let employee = db.user(RoleName::Employee, &[]).await?;
    let payment = db.additional_payment(employee, "generated").await?;

    let loaded = records::fetch_one::<AdditionalPayment>(&db.pool, payment).await?;
    force_status(&db, "additional_payments", payment, "paid").await?;

    let err = records::delete(&db.pool, &loaded).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "{err:?}");
    assert!(records::find::<AdditionalPayment>(&db.pool, payment).await?.is_some());
    assert_eq!(db.status_of("additional_payments", payment).await?, "paid");
    Ok(())
}

#[tokio::test]
async fn field_update_of_a_stale_record_conflicts_and_keeps_fields() -> Result<()> {
    let db = common::test_db().await?;
    let employee = db.user(RoleName::Employee, &[]).await?;
    let leave = db.leave(employee, "requested").await?;

    let mut edited = records::fetch_one::<LeaveRequest>(&db.pool, leave).await?;
    edited.reason = Some("moved to August".to_string());
    edited.leave_type = "sick".to_string();
    force_status(&db, "leave_requests", leave, "approved").await?;

    let err = records::update_leave(&db.pool, &edited).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "{err:?}");

    let stored = records::fetch_one::<LeaveRequest>(&db.pool, leave).await?;
    assert_eq!(stored.status, "approved");
    assert_eq!(stored.leave_type, "annual");
    assert_eq!(stored.reason, None);
    Ok(())
}

#[tokio::test]
async fn fresh_writes_still_succeed() -> Result<()> {
    let db = common::test_db().await?;
    let employee = db.user(RoleName::Employee, &[]).await?;
    let leave = db.leave(employee, "requested").await?;

    let mut edited = records::fetch_one::<LeaveRequest>(&db.pool, leave).await?;
    edited.reason = Some("family event".to_string());
    let saved = records::update_leave(&db.pool, &edited).await?;
    assert_eq!(saved.reason.as_deref(), Some("family event"));

    let patch = lifecycle::transition(&LEAVE, "requested", &ReviewMeta::default(), "cancelled", employee, &FixedClock(Utc::now()))?;
    let moved = records::update_status::<LeaveRequest>(&db.pool, leave, &patch).await?;
    assert_eq!(moved.status, "cancelled");
    Ok(())
}
