use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::principal::Role;

/// Resources addressed by the capability matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Users,
    Payroll,
    Leaves,
    Inventory,
    Departments,
    System,
}

impl Resource {
    pub const ALL: [Resource; 6] = [
        Resource::Users,
        Resource::Payroll,
        Resource::Leaves,
        Resource::Inventory,
        Resource::Departments,
        Resource::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Users => "users",
            Resource::Payroll => "payroll",
            Resource::Leaves => "leaves",
            Resource::Inventory => "inventory",
            Resource::Departments => "departments",
            Resource::System => "system",
        }
    }
}

/// Actions a role may be granted on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    ViewAll,
    ViewDepartment,
    ViewOwn,
    Approve,
    ManageSettings,
    Create,
    Edit,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ViewAll => "viewAll",
            Action::ViewDepartment => "viewDepartment",
            Action::ViewOwn => "viewOwn",
            Action::Approve => "approve",
            Action::ManageSettings => "manageSettings",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }
}

/// Granted actions for one resource. Every flag defaults to `false`, so a
/// key missing from the persisted JSON is a denial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct Capabilities {
    pub view_all: bool,
    pub view_department: bool,
    pub view_own: bool,
    pub approve: bool,
    pub manage_settings: bool,
    pub create: bool,
    pub edit: bool,
    pub delete: bool,
}

impl Capabilities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            view_all: true,
            view_department: true,
            view_own: true,
            approve: true,
            manage_settings: true,
            create: true,
            edit: true,
            delete: true,
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::ViewAll => self.view_all,
            Action::ViewDepartment => self.view_department,
            Action::ViewOwn => self.view_own,
            Action::Approve => self.approve,
            Action::ManageSettings => self.manage_settings,
            Action::Create => self.create,
            Action::Edit => self.edit,
            Action::Delete => self.delete,
        }
    }
}

/// Per-role capability matrix, one fixed row per [`Resource`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct CapabilityMatrix {
    pub users: Capabilities,
    pub payroll: Capabilities,
    pub leaves: Capabilities,
    pub inventory: Capabilities,
    pub departments: Capabilities,
    pub system: Capabilities,
}

impl CapabilityMatrix {
    pub fn row(&self, resource: Resource) -> &Capabilities {
        match resource {
            Resource::Users => &self.users,
            Resource::Payroll => &self.payroll,
            Resource::Leaves => &self.leaves,
            Resource::Inventory => &self.inventory,
            Resource::Departments => &self.departments,
            Resource::System => &self.system,
        }
    }

    pub fn allows(&self, resource: Resource, action: Action) -> bool {
        self.row(resource).allows(action)
    }

    /// Everything on every resource.
    pub fn admin() -> Self {
        Self {
            users: Capabilities::all(),
            payroll: Capabilities::all(),
            leaves: Capabilities::all(),
            inventory: Capabilities::all(),
            departments: Capabilities::all(),
            system: Capabilities::all(),
        }
    }

    /// Department-scoped review of payroll and leave.
    pub fn manager() -> Self {
        let reviewer = Capabilities {
            view_department: true,
            view_own: true,
            approve: true,
            create: true,
            edit: true,
            ..Capabilities::none()
        };

        Self {
            users: Capabilities {
                view_department: true,
                view_own: true,
                ..Capabilities::none()
            },
            payroll: reviewer,
            leaves: reviewer,
            inventory: Capabilities {
                view_department: true,
                ..Capabilities::none()
            },
            departments: Capabilities {
                view_own: true,
                ..Capabilities::none()
            },
            system: Capabilities::none(),
        }
    }

    pub fn employee() -> Self {
        let own = Capabilities {
            view_own: true,
            ..Capabilities::none()
        };

        Self {
            users: own,
            payroll: own,
            leaves: Capabilities {
                view_own: true,
                create: true,
                ..Capabilities::none()
            },
            inventory: own,
            departments: own,
            system: Capabilities::none(),
        }
    }
}

/// True only when the role's matrix explicitly grants `action` on `resource`.
pub fn resolve_capability(role: &Role, resource: Resource, action: Action) -> bool {
    role.capabilities.allows(resource, action)
}
