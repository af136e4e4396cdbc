//! # bizhub-database
//!
//! Persistence for the notification engine: the async store traits the
//! service layer depends on, their PostgreSQL implementations, and
//! DashMap-backed in-memory implementations used for development and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;
pub mod stores;

pub use connection::DatabasePool;
pub use store::{NotificationStore, PreferenceStore, ReadOutcome, UserDirectory};
pub use stores::Stores;
