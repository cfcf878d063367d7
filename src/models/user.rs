use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::{CapabilityMatrix, Owned, Principal, RoleName};

use super::department::Department;

/// Directory entry for an employee account.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: RoleName,
    pub is_active: bool,
    pub departments: Vec<Department>,
    pub created_at: DateTime<Utc>,
}

impl Owned for User {
    fn owner_id(&self) -> Uuid {
        self.id
    }
}

/// What `GET /auth/me` reports about the caller.
#[derive(Debug, Serialize, ToSchema)]
pub struct PrincipalSummary {
    pub id: Uuid,
    pub role: RoleName,
    pub level: String,
    pub super_admin: bool,
    pub departments: Vec<Uuid>,
    pub capabilities: CapabilityMatrix,
}

impl From<&Principal> for PrincipalSummary {
    fn from(p: &Principal) -> Self {
        Self {
            id: p.id,
            role: p.role.name,
            level: p.role.level.clone(),
            super_admin: p.super_admin,
            departments: p.departments.iter().copied().collect(),
            capabilities: p.role.capabilities.clone(),
        }
    }
}
