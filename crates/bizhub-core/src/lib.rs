//! # bizhub-core
//!
//! Core crate for BizHub. Contains configuration schemas, pagination and
//! date-range types, and the unified error system.
//!
//! This crate has **no** internal dependencies on other BizHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
