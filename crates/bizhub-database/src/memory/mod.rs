//! DashMap-backed store implementations for development and tests.

pub mod notification;
pub mod preference;
pub mod user;

pub use notification::MemoryNotificationStore;
pub use preference::MemoryPreferenceStore;
pub use user::MemoryUserDirectory;
