//! Role gate. Each route names a [`RolePolicy`]; the check runs after the
//! user and active organization are resolved and before any mutation.
//!
//! The applicable role is the membership role in the active organization.
//! Routes with no active organization (superadmin tools) fall back to the
//! user's global role.

use crate::app::{domain::Role, error::AppError, identity::CurrentUser};

/// Roles accepted when a route does not name any.
pub const BASELINE_ROLES: &[Role] = &[Role::User, Role::Admin];

/// Which roles a route accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredRoles {
    /// Any authenticated user holding a baseline role.
    AnyAuthenticated,
    /// Exactly these roles. An empty set behaves like `AnyAuthenticated`.
    OneOf(&'static [Role]),
}

/// Per-route authorization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolePolicy {
    pub required: RequiredRoles,
    /// Superadmins pass regardless of `required`.
    pub allow_superadmin_override: bool,
}

impl RolePolicy {
    pub const ANY_AUTHENTICATED: RolePolicy = RolePolicy {
        required: RequiredRoles::AnyAuthenticated,
        allow_superadmin_override: true,
    };

    pub const ADMIN: RolePolicy = RolePolicy {
        required: RequiredRoles::OneOf(&[Role::Admin]),
        allow_superadmin_override: true,
    };

    pub const SUPERADMIN: RolePolicy = RolePolicy {
        required: RequiredRoles::OneOf(&[Role::Superadmin]),
        allow_superadmin_override: true,
    };

    fn allowed_roles(&self) -> &'static [Role] {
        match self.required {
            RequiredRoles::OneOf(roles) if !roles.is_empty() => roles,
            _ => BASELINE_ROLES,
        }
    }

    /// Decide a request given the user's global role and, when an organization
    /// is active, the membership role in it.
    pub fn permits(&self, global_role: Role, org_role: Option<Role>) -> bool {
        if self.allow_superadmin_override
            && (global_role.is_superadmin() || org_role.is_some_and(Role::is_superadmin))
        {
            return true;
        }

        let applicable = org_role.unwrap_or(global_role);
        self.allowed_roles().contains(&applicable)
    }
}

/// Accept or reject `user` under `policy`. Rejection is `Forbidden`.
pub fn require_role(user: &CurrentUser, org_role: Option<Role>, policy: &RolePolicy) -> Result<(), AppError> {
    if policy.permits(user.role, org_role) {
        return Ok(());
    }

    tracing::info!(
        user_id = %user.id,
        global_role = %user.role,
        org_role = ?org_role,
        required = ?policy.required,
        "role check failed"
    );
    Err(AppError::Forbidden)
}

/// Any authenticated user.
pub fn require_user(user: &CurrentUser, org_role: Option<Role>) -> Result<(), AppError> {
    require_role(user, org_role, &RolePolicy::ANY_AUTHENTICATED)
}

pub fn require_admin(user: &CurrentUser, org_role: Option<Role>) -> Result<(), AppError> {
    require_role(user, org_role, &RolePolicy::ADMIN)
}

pub fn require_super_admin(user: &CurrentUser) -> Result<(), AppError> {
    require_role(user, None, &RolePolicy::SUPERADMIN)
}
