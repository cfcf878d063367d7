//! Authorization module - capability model, role resolver and scope filter
//!
//! This module decides what a resolved principal may see or do:
//! - Fixed-shape, deny-by-default capability matrix per role
//! - Role predicates with super admin bypass
//! - Scope filtering (all / own department / own records)

pub mod capability;
pub mod principal;
pub mod resolver;
pub mod scope;

pub use capability::{resolve_capability, Action, Capabilities, CapabilityMatrix, Resource};
pub use principal::{Principal, Role, RoleName};
pub use resolver::{has_full_access, is_admin, is_employee, is_manager, is_super_admin, permits};
pub use scope::{can_view, scope_for, visible_records, DepartmentDirectory, Owned, ResourceKind, Scope};

/// Well-known role names
pub mod roles {
    pub const ADMIN: &str = "admin";
    pub const MANAGER: &str = "manager";
    pub const EMPLOYEE: &str = "employee";
}
