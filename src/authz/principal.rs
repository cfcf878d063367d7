use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::capability::CapabilityMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    Admin,
    Manager,
    Employee,
}

impl RoleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Admin => super::roles::ADMIN,
            RoleName::Manager => super::roles::MANAGER,
            RoleName::Employee => super::roles::EMPLOYEE,
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            super::roles::ADMIN => Ok(RoleName::Admin),
            super::roles::MANAGER => Ok(RoleName::Manager),
            super::roles::EMPLOYEE => Ok(RoleName::Employee),
            other => Err(format!("unknown role name: {other}")),
        }
    }
}

/// A role with its coarse routing level and capability matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: RoleName,
    pub level: String,
    pub capabilities: CapabilityMatrix,
}

impl Role {
    pub fn new(name: RoleName, level: impl Into<String>, capabilities: CapabilityMatrix) -> Self {
        Self {
            name,
            level: level.into(),
            capabilities,
        }
    }

    /// Role carrying the built-in matrix for its name.
    pub fn preset(name: RoleName) -> Self {
        let capabilities = match name {
            RoleName::Admin => CapabilityMatrix::admin(),
            RoleName::Manager => CapabilityMatrix::manager(),
            RoleName::Employee => CapabilityMatrix::employee(),
        };
        Self::new(name, name.as_str(), capabilities)
    }
}

/// Principal represents the authenticated user with their role and department memberships
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub super_admin: bool,
    pub role: Role,
    pub departments: BTreeSet<Uuid>,
}

impl Principal {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self {
            id,
            super_admin: false,
            role,
            departments: BTreeSet::new(),
        }
    }

    pub fn with_super_admin(mut self, super_admin: bool) -> Self {
        self.super_admin = super_admin;
        self
    }

    pub fn with_departments(mut self, departments: impl IntoIterator<Item = Uuid>) -> Self {
        self.departments = departments.into_iter().collect();
        self
    }

    pub fn has_role(&self, role: RoleName) -> bool {
        self.role.name == role
    }

    pub fn is_super_admin(&self) -> bool {
        self.super_admin
    }

    pub fn shares_department(&self, other: &BTreeSet<Uuid>) -> bool {
        !self.departments.is_disjoint(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_parse_case_insensitively() {
        assert_eq!("Manager".parse::<RoleName>(), Ok(RoleName::Manager));
        assert_eq!(" admin ".parse::<RoleName>(), Ok(RoleName::Admin));
        assert!("auditor".parse::<RoleName>().is_err());
    }

    #[test]
    fn any_shared_department_is_enough() {
        let x = Uuid::new_v4();
        let y = Uuid::new_v4();
        let principal = Principal::new(Uuid::new_v4(), Role::preset(RoleName::Manager)).with_departments([x]);

        assert!(principal.shares_department(&BTreeSet::from([y, x])));
        assert!(!principal.shares_department(&BTreeSet::from([y])));
        assert!(!principal.shares_department(&BTreeSet::new()));
    }
}
