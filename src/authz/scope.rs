//! Scope filter: which candidate records a principal may see.
//!
//! Rules are evaluated in a fixed order and the first one granted wins:
//! 1. super admin or `viewAll` -> every candidate
//! 2. `viewDepartment` -> owner shares at least one department with the principal
//! 3. `viewOwn` -> owner is the principal
//! 4. nothing

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::capability::{resolve_capability, Action, Resource};
use super::principal::Principal;

/// Resource kind selector supplied by the request layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Payroll,
    AdditionalPayment,
    Leave,
    Inventory,
    Users,
    Departments,
}

impl ResourceKind {
    /// Capability row that governs this kind.
    pub fn capability_resource(&self) -> Resource {
        match self {
            ResourceKind::Payroll | ResourceKind::AdditionalPayment => Resource::Payroll,
            ResourceKind::Leave => Resource::Leaves,
            ResourceKind::Inventory => Resource::Inventory,
            ResourceKind::Users => Resource::Users,
            ResourceKind::Departments => Resource::Departments,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Payroll => "payroll",
            ResourceKind::AdditionalPayment => "additional-payment",
            ResourceKind::Leave => "leave",
            ResourceKind::Inventory => "inventory",
            ResourceKind::Users => "users",
            ResourceKind::Departments => "departments",
        }
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payroll" => Ok(ResourceKind::Payroll),
            "additional-payment" => Ok(ResourceKind::AdditionalPayment),
            "leave" => Ok(ResourceKind::Leave),
            "inventory" => Ok(ResourceKind::Inventory),
            "users" => Ok(ResourceKind::Users),
            "departments" => Ok(ResourceKind::Departments),
            other => Err(format!("unknown resource kind: {other}")),
        }
    }
}

/// Breadth of visibility that applies to a principal for one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    All,
    Department,
    Own,
    None,
}

/// Anything with an owning user.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

/// Department memberships of record owners.
pub trait DepartmentDirectory {
    fn departments_of(&self, user_id: Uuid) -> Option<&BTreeSet<Uuid>>;
}

impl DepartmentDirectory for HashMap<Uuid, BTreeSet<Uuid>> {
    fn departments_of(&self, user_id: Uuid) -> Option<&BTreeSet<Uuid>> {
        self.get(&user_id)
    }
}

pub fn scope_for(principal: Option<&Principal>, kind: ResourceKind) -> Scope {
    let Some(principal) = principal else {
        return Scope::None;
    };
    let resource = kind.capability_resource();
    let role = &principal.role;

    if principal.is_super_admin() || resolve_capability(role, resource, Action::ViewAll) {
        Scope::All
    } else if resolve_capability(role, resource, Action::ViewDepartment) {
        Scope::Department
    } else if resolve_capability(role, resource, Action::ViewOwn) {
        Scope::Own
    } else {
        Scope::None
    }
}

fn in_scope<D>(scope: Scope, principal: &Principal, owner_id: Uuid, directory: &D) -> bool
where
    D: DepartmentDirectory + ?Sized,
{
    match scope {
        Scope::All => true,
        Scope::Department => directory
            .departments_of(owner_id)
            .is_some_and(|owner_departments| principal.shares_department(owner_departments)),
        Scope::Own => owner_id == principal.id,
        Scope::None => false,
    }
}

/// Single-record form of [`visible_records`].
pub fn can_view<D>(principal: Option<&Principal>, kind: ResourceKind, owner_id: Uuid, directory: &D) -> bool
where
    D: DepartmentDirectory + ?Sized,
{
    let Some(p) = principal else {
        return false;
    };
    in_scope(scope_for(principal, kind), p, owner_id, directory)
}

pub fn visible_records<T, D>(
    principal: Option<&Principal>,
    kind: ResourceKind,
    candidates: Vec<T>,
    directory: &D,
) -> Vec<T>
where
    T: Owned,
    D: DepartmentDirectory + ?Sized,
{
    let Some(p) = principal else {
        return Vec::new();
    };

    let scope = scope_for(principal, kind);
    tracing::debug!(
        user_id = %p.id,
        kind = kind.as_str(),
        scope = ?scope,
        candidates = candidates.len(),
        "filtering records by scope"
    );

    match scope {
        Scope::All => candidates,
        Scope::None => Vec::new(),
        _ => candidates
            .into_iter()
            .filter(|record| in_scope(scope, p, record.owner_id(), directory))
            .collect(),
    }
}
