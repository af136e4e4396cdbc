//! # bizhub-entity
//!
//! Domain entity models for BizHub notifications. Every struct in this crate
//! represents a stored row or a domain value object. All entities derive
//! `Debug`, `Clone`, `Serialize` and `Deserialize`; enums stored as Postgres
//! enum types additionally derive `sqlx::Type`.

pub mod notification;
pub mod user;
