//! # bizhub-auth
//!
//! Token validation and authorization for the notification engine.
//!
//! Tokens are issued by the identity subsystem; this crate only verifies
//! them and maps roles to notification permissions.
//!
//! ## Modules
//!
//! - `jwt`: claims, HS256 validation, and token minting for tooling/tests
//! - `rbac`: role to notification-permission policy enforcement

pub mod jwt;
pub mod rbac;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
pub use rbac::{NotificationPermission, RbacEnforcer};
