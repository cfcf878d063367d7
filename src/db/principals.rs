//! Resolving authenticated user ids into principals, and department
//! memberships for scope checks.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::row_parsers::{parse_datetime, uuid_col};
use crate::authz::{CapabilityMatrix, Principal, Role, RoleName};
use crate::errors::{AppError, AppResult};
use crate::models::department::Department;
use crate::models::user::User;

pub type Directory = HashMap<Uuid, BTreeSet<Uuid>>;

fn parse_role(name: &str, level: String, capabilities: &str) -> AppResult<Role> {
    let name: RoleName = name.parse().map_err(AppError::internal)?;
    let capabilities: CapabilityMatrix = serde_json::from_str(capabilities)
        .map_err(|e| AppError::internal(format!("invalid capability matrix for role {name}: {e}")))?;
    Ok(Role::new(name, level, capabilities))
}

/// Load the principal for an authenticated user. Unknown and deactivated
/// users are treated as unauthenticated.
pub async fn load_principal(pool: &SqlitePool, user_id: Uuid) -> AppResult<Principal> {
    let row = sqlx::query(
        "SELECT u.is_super_admin, u.is_active, r.name AS role_name, r.level, r.capabilities \
         FROM users u JOIN roles r ON r.id = u.role_id WHERE u.id = ?",
    )
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::unauthenticated("unknown user"))?;

    let is_active: bool = row.try_get("is_active")?;
    if !is_active {
        tracing::info!(user_id = %user_id, "inactive user rejected");
        return Err(AppError::unauthenticated("account is deactivated"));
    }

    let role_name: String = row.try_get("role_name")?;
    let level: String = row.try_get("level")?;
    let capabilities: String = row.try_get("capabilities")?;
    let role = parse_role(&role_name, level, &capabilities)?;

    let departments = departments_of(pool, user_id).await?;

    Ok(Principal::new(user_id, role)
        .with_super_admin(row.try_get("is_super_admin")?)
        .with_departments(departments))
}

pub async fn departments_of(pool: &SqlitePool, user_id: Uuid) -> AppResult<BTreeSet<Uuid>> {
    let rows = sqlx::query("SELECT department_id FROM user_departments WHERE user_id = ?")
        .bind(user_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(|row| uuid_col(row, "department_id")).collect()
}

/// Department memberships of every user.
pub async fn directory(pool: &SqlitePool) -> AppResult<Directory> {
    let rows = sqlx::query("SELECT user_id, department_id FROM user_departments")
        .fetch_all(pool)
        .await?;

    let mut out = Directory::new();
    for row in &rows {
        out.entry(uuid_col(row, "user_id")?)
            .or_default()
            .insert(uuid_col(row, "department_id")?);
    }
    Ok(out)
}

/// Directory holding only `user_id`, for single-record checks.
pub async fn directory_for(pool: &SqlitePool, user_id: Uuid) -> AppResult<Directory> {
    let departments = departments_of(pool, user_id).await?;
    Ok(Directory::from([(user_id, departments)]))
}

pub async fn user_exists(pool: &SqlitePool, user_id: Uuid) -> AppResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE id = ? AND is_active = 1")
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

pub async fn list_users(pool: &SqlitePool) -> AppResult<Vec<User>> {
    let rows = sqlx::query(
        "SELECT u.id, u.name, u.email, u.is_active, u.created_at, r.name AS role_name \
         FROM users u JOIN roles r ON r.id = u.role_id ORDER BY u.name",
    )
    .fetch_all(pool)
    .await?;

    let department_rows = sqlx::query(
        "SELECT ud.user_id, d.id, d.name FROM user_departments ud JOIN departments d ON d.id = ud.department_id ORDER BY d.name",
    )
    .fetch_all(pool)
    .await?;

    let mut departments: HashMap<Uuid, Vec<Department>> = HashMap::new();
    for row in &department_rows {
        departments.entry(uuid_col(row, "user_id")?).or_default().push(Department {
            id: uuid_col(row, "id")?,
            name: row.try_get("name")?,
        });
    }

    rows.iter()
        .map(|row| {
            let id = uuid_col(row, "id")?;
            let role_name: String = row.try_get("role_name")?;
            let created_at: String = row.try_get("created_at")?;
            let created_at: DateTime<Utc> = parse_datetime(&created_at)?;
            Ok(User {
                id,
                name: row.try_get("name")?,
                email: row.try_get("email")?,
                role: role_name.parse().map_err(AppError::internal)?,
                is_active: row.try_get("is_active")?,
                departments: departments.remove(&id).unwrap_or_default(),
                created_at,
            })
        })
        .collect()
}
