//! Data Transfer Objects for API requests and responses.

pub mod request;
pub mod response;

use validator::Validate;

use bizhub_core::error::AppError;

/// Run `validator` rules on a request body.
pub fn validated<T: Validate>(body: T) -> Result<T, AppError> {
    body.validate()
        .map_err(|e| AppError::validation(e.to_string().replace('\n', "; ")))?;
    Ok(body)
}
