//! Inclusive-exclusive date range used by statistics queries.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Default look-back window when a range has no lower bound.
const DEFAULT_WINDOW_DAYS: i64 = 30;

/// A `[from, to)` time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Inclusive start.
    pub from: DateTime<Utc>,
    /// Exclusive end.
    pub to: DateTime<Utc>,
}

impl DateRange {
    /// Build a range, rejecting inverted bounds.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, AppError> {
        if from > to {
            return Err(AppError::validation(format!(
                "Invalid date range: 'from' ({from}) is after 'to' ({to})"
            )));
        }
        Ok(Self { from, to })
    }

    /// Resolve optional bounds: `to` defaults to now, `from` to 30 days before `to`.
    pub fn resolve(
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Self, AppError> {
        let to = to.unwrap_or_else(Utc::now);
        let from = from.unwrap_or(to - Duration::days(DEFAULT_WINDOW_DAYS));
        Self::new(from, to)
    }

    /// Whether the instant falls inside the range.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.from && at < self.to
    }
}
