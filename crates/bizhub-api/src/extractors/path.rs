//! Typed path parameter helpers.

use uuid::Uuid;

use bizhub_core::error::AppError;

/// Parses a notification id from a path segment.
///
/// Used instead of `Path<Uuid>` so malformed ids get the JSON error body.
pub fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(s).map_err(|_| AppError::validation(format!("Invalid UUID: {s}")))
}
