//! Core type definitions used across the BizHub workspace.

pub mod pagination;
pub mod range;

pub use pagination::{PageRequest, PageResponse};
pub use range::DateRange;
