//! PostgreSQL implementations of the store traits.

pub mod notification;
pub mod preference;
pub mod user;

pub use notification::NotificationRepository;
pub use preference::PreferenceRepository;
pub use user::UserRepository;
