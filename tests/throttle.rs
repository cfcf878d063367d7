mod common;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::json;
use tower::util::ServiceExt;

use paydesk::authz::RoleName;
use paydesk::events::init_event_bus;
use paydesk::jwt::JwtConfig;
use paydesk::throttle::ThrottleConfig;
use paydesk::{router, AppState};

#[tokio::test]
async fn mutations_beyond_the_window_budget_are_rejected() -> Result<()> {
    let db = common::test_db().await?;
    let employee = db.user(RoleName::Employee, &[]).await?;
    let leave = db.leave(employee, "requested").await?;

    let (event_bus, _rx) = init_event_bus();
    let throttle = ThrottleConfig {
        max_attempts: 2,
        window: Duration::from_secs(60),
        prune_every: 100,
        trust_proxy: false,
    };
    let app = router(AppState::new(db.pool.clone(), JwtConfig::new(common::SECRET, 1), throttle, event_bus));

    let uri = format!("/leaves/{leave}/status");
    for _ in 0..2 {
        // An unknown status still consumes an attempt.
        let (status, _) = common::send(&app, "PATCH", &uri, Some(employee), Some(json!({"status": "x"}))).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, body) = common::send(&app, "PATCH", &uri, Some(employee), Some(json!({"status": "cancelled"}))).await?;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "too_many_requests");
    assert_eq!(db.status_of("leave_requests", leave).await?, "requested");

    // Reads are never throttled.
    let (status, _) = common::send(&app, "GET", "/leaves", Some(employee), None).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

fn throttled_app(db: &common::TestDb, max_attempts: u32, trust_proxy: bool) -> Router {
    let (event_bus, _rx) = init_event_bus();
    let throttle = ThrottleConfig {
        max_attempts,
        window: Duration::from_secs(60),
        prune_every: 100,
        trust_proxy,
    };
    router(AppState::new(db.pool.clone(), JwtConfig::new(common::SECRET, 1), throttle, event_bus))
}

async fn patch_from(app: &Router, uri: &str, user: uuid::Uuid, peer: [u8; 4], forwarded_for: &str) -> Result<StatusCode> {
    let mut req = Request::builder()
        .method("PATCH")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", common::token(user)))
        .header("x-forwarded-for", forwarded_for)
        .body(Body::from(json!({"status": "x"}).to_string()))?;
    req.extensions_mut().insert(ConnectInfo(SocketAddr::from((peer, 50000))));
    Ok(app.clone().oneshot(req).await?.status())
}

#[tokio::test]
async fn rotating_forwarded_for_does_not_reset_the_budget() -> Result<()> {
    let db = common::test_db().await?;
    let employee = db.user(RoleName::Employee, &[]).await?;
    let leave = db.leave(employee, "requested").await?;
    let app = throttled_app(&db, 2, false);
    let uri = format!("/leaves/{leave}/status");

    let mut codes = Vec::new();
    for i in 0..6 {
        codes.push(patch_from(&app, &uri, employee, [192, 168, 0, 10], &format!("10.9.9.{i}")).await?);
    }
    assert_eq!(&codes[..2], &[StatusCode::BAD_REQUEST, StatusCode::BAD_REQUEST]);
    assert!(codes[2..].iter().all(|code| *code == StatusCode::TOO_MANY_REQUESTS), "{codes:?}");

    // A different peer has its own window.
    let other = patch_from(&app, &uri, employee, [192, 168, 0, 11], "10.9.9.0").await?;
    assert_eq!(other, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn trusted_proxy_budgets_per_forwarded_client() -> Result<()> {
    let db = common::test_db().await?;
    let employee = db.user(RoleName::Employee, &[]).await?;
    let leave = db.leave(employee, "requested").await?;
    let app = throttled_app(&db, 1, true);
    let uri = format!("/leaves/{leave}/status");
    let proxy = [10, 0, 0, 2];

    assert_eq!(patch_from(&app, &uri, employee, proxy, "203.0.113.1").await?, StatusCode::BAD_REQUEST);
    assert_eq!(patch_from(&app, &uri, employee, proxy, "203.0.113.1").await?, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(patch_from(&app, &uri, employee, proxy, "203.0.113.2").await?, StatusCode::BAD_REQUEST);
    Ok(())
}
