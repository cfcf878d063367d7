use serde_json::Value;

#[test]
fn openapi_leave_schema_carries_review_fields() -> anyhow::Result<()> {
    let doc = paydesk::docs::build_openapi();
    let v = serde_json::to_value(&doc)?;

    let leave = v
        .get("components")
        .and_then(|c| c.get("schemas"))
        .and_then(|s| s.get("LeaveRequest"))
        .expect("components.schemas.LeaveRequest must exist");

    // Review columns are flattened in from ReviewMeta, which utoipa renders
    // either inline or through an allOf.
    let rendered = leave.to_string();
    for key in ["status", "employee_id", "start_date", "end_date"] {
        assert!(rendered.contains(key), "LeaveRequest schema missing '{}'", key);
    }

    let review = v["components"]["schemas"]["ReviewMeta"]["properties"]
        .as_object()
        .expect("ReviewMeta properties");
    for key in ["reviewed_by", "reviewed_at", "processed_by", "processed_at"] {
        assert!(review.contains_key(key), "ReviewMeta schema missing '{}'", key);
    }

    Ok(())
}

#[test]
fn every_record_kind_exposes_a_status_route() {
    let doc = serde_json::to_value(paydesk::docs::build_openapi()).expect("serializes");
    for path in ["/payrolls/{id}/status", "/additional-payments/{id}/status", "/leaves/{id}/status"] {
        assert!(
            doc["paths"][path].get("patch").is_some_and(Value::is_object),
            "missing PATCH {path}"
        );
    }
}
