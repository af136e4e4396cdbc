//! RBAC enforcement for notification operations.

use bizhub_core::error::AppError;
use bizhub_entity::user::UserRole;

/// Permissions guarded by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationPermission {
    /// Read and manage one's own notifications and preferences.
    ManageOwn,
    /// Send announcements to arbitrary recipients.
    Broadcast,
    /// Send a test notification to oneself.
    SendTest,
    /// View delivery statistics.
    ViewStatistics,
}

/// Enforces role-based access control for notification operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct RbacEnforcer;

impl RbacEnforcer {
    /// Creates a new enforcer with the built-in policy.
    pub fn new() -> Self {
        Self
    }

    /// Checks whether the role has the permission (returns bool).
    pub fn has_permission(&self, role: &UserRole, permission: NotificationPermission) -> bool {
        match permission {
            NotificationPermission::ManageOwn => true,
            NotificationPermission::Broadcast
            | NotificationPermission::SendTest
            | NotificationPermission::ViewStatistics => role.is_admin(),
        }
    }

    /// Checks whether the given role has the required permission.
    ///
    /// Returns `Ok(())` if allowed, or an authorization error if denied.
    pub fn require_permission(
        &self,
        role: &UserRole,
        permission: NotificationPermission,
    ) -> Result<(), AppError> {
        if self.has_permission(role, permission) {
            Ok(())
        } else {
            Err(AppError::authorization(format!(
                "Role '{role}' does not have permission '{permission:?}'"
            )))
        }
    }
}
