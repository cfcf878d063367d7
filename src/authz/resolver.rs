use super::capability::{resolve_capability, Action, Resource};
use super::principal::{Principal, RoleName};

pub fn is_admin(principal: Option<&Principal>) -> bool {
    principal.is_some_and(|p| p.has_role(RoleName::Admin))
}

pub fn is_manager(principal: Option<&Principal>) -> bool {
    principal.is_some_and(|p| p.has_role(RoleName::Manager))
}

pub fn is_employee(principal: Option<&Principal>) -> bool {
    principal.is_some_and(|p| p.has_role(RoleName::Employee))
}

pub fn has_full_access(principal: Option<&Principal>) -> bool {
    is_admin(principal) || is_manager(principal)
}

pub fn is_super_admin(principal: Option<&Principal>) -> bool {
    principal.is_some_and(Principal::is_super_admin)
}

/// Capability gate. Evaluation order:
/// 1. no principal -> deny
/// 2. super admin -> allow
/// 3. role matrix
pub fn permits(principal: Option<&Principal>, resource: Resource, action: Action) -> bool {
    let Some(principal) = principal else {
        return false;
    };

    if principal.is_super_admin() {
        tracing::debug!(
            user_id = %principal.id,
            resource = resource.as_str(),
            action = action.as_str(),
            "super_admin bypass"
        );
        return true;
    }

    let allowed = resolve_capability(&principal.role, resource, action);
    if !allowed {
        tracing::debug!(
            user_id = %principal.id,
            role = %principal.role.name,
            resource = resource.as_str(),
            action = action.as_str(),
            "capability denied"
        );
    }
    allowed
}
