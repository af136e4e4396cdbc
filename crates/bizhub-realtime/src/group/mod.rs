//! Connection groups: `user:{id}` and `role:{role}`.

pub mod registry;

pub use registry::GroupRegistry;

use uuid::Uuid;

use bizhub_entity::user::UserRole;

/// Group holding every connection of one user.
pub fn user_group(user_id: Uuid) -> String {
    format!("user:{user_id}")
}

/// Group holding every connection of users with one role.
pub fn role_group(role: UserRole) -> String {
    format!("role:{role}")
}
