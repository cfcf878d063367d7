//! Fixtures shared by the integration tests: a migrated temp database,
//! seeded roles/users/records, and a request helper.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

use paydesk::authz::{Role, RoleName};
use paydesk::events::{init_event_bus, start_activity_listener};
use paydesk::jwt::JwtConfig;
use paydesk::throttle::ThrottleConfig;
use paydesk::AppState;

pub const SECRET: &str = "test-secret";

pub struct TestDb {
    // Keeps the database file alive for the test's duration.
    pub _dir: TempDir,
    pub pool: SqlitePool,
    pub roles: HashMap<RoleName, String>,
}

pub async fn test_db() -> Result<TestDb> {
    let dir = tempfile::tempdir()?;
    let opts = SqliteConnectOptions::new()
        .filename(dir.path().join("test.db"))
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
    migrator.run(&pool).await?;

    let mut roles = HashMap::new();
    for name in [RoleName::Admin, RoleName::Manager, RoleName::Employee] {
        let role = Role::preset(name);
        let id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO roles (id, name, level, capabilities) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(name.as_str())
            .bind(&role.level)
            .bind(serde_json::to_string(&role.capabilities)?)
            .execute(&pool)
            .await?;
        roles.insert(name, id);
    }

    Ok(TestDb { _dir: dir, pool, roles })
}

/// Migrated database plus the production router with a fixed signing secret
/// and the default throttle. Nothing is read from the process environment.
pub async fn test_app() -> Result<(TestDb, Router)> {
    let db = test_db().await?;
    let (event_bus, rx) = init_event_bus();
    tokio::spawn(start_activity_listener(rx, db.pool.clone()));

    let state = AppState::new(db.pool.clone(), JwtConfig::new(SECRET, 24), ThrottleConfig::default(), event_bus);
    Ok((db, paydesk::router(state)))
}

impl TestDb {
    pub async fn department(&self, name: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO departments (id, name) VALUES (?, ?)")
            .bind(id.to_string())
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    pub async fn user(&self, role: RoleName, departments: &[Uuid]) -> Result<Uuid> {
        self.user_with(role, departments, false, true).await
    }

    pub async fn user_with(&self, role: RoleName, departments: &[Uuid], super_admin: bool, active: bool) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (id, name, email, role_id, is_super_admin, is_active) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(id.to_string())
            .bind(format!("{role} {}", &id.to_string()[..8]))
            .bind(format!("{id}@example.com"))
            .bind(&self.roles[&role])
            .bind(super_admin)
            .bind(active)
            .execute(&self.pool)
            .await?;

        for department in departments {
            sqlx::query("INSERT INTO user_departments (user_id, department_id) VALUES (?, ?)")
                .bind(id.to_string())
                .bind(department.to_string())
                .execute(&self.pool)
                .await?;
        }
        Ok(id)
    }

    pub async fn leave(&self, employee: Uuid, status: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO leave_requests (id, employee_id, leave_type, start_date, end_date, status, created_at, updated_at) \
             VALUES (?, ?, 'annual', '2026-07-01', '2026-07-03', ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(employee.to_string())
        .bind(status)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn additional_payment(&self, employee: Uuid, status: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO additional_payments (id, employee_id, amount, reason, payment_date, status, created_at, updated_at) \
             VALUES (?, ?, 250000, 'overtime', '2026-07-15', ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(employee.to_string())
        .bind(status)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn payroll(&self, employee: Uuid, month: i64, status: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO payrolls (id, employee_id, period_month, period_year, base_salary, allowances, deductions, net_salary, status, created_at, updated_at) \
             VALUES (?, ?, ?, 2026, 5000000, 500000, 250000, 5250000, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(employee.to_string())
        .bind(month)
        .bind(status)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn status_of(&self, table: &str, id: Uuid) -> Result<String> {
        let status: String = sqlx::query_scalar(&format!("SELECT status FROM {table} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(status)
    }
}

pub fn token(user_id: Uuid) -> String {
    JwtConfig::new(SECRET, 24).encode(user_id).expect("token encodes")
}

/// Send one request and return the status with the parsed JSON body
/// (`Value::Null` when the body is empty).
pub async fn send(app: &Router, method: &str, uri: &str, user: Option<Uuid>, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("authorization", format!("Bearer {}", token(user)));
    }
    let req = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let resp = app.clone().oneshot(req).await?;
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    Ok((status, value))
}
