//! Stock-level notification selection.
//!
//! A stock change produces at most one notification type. The type is
//! chosen against the most permissive band across all stock recipients;
//! each recipient is then re-checked against their own thresholds during
//! fan-out.

use serde::Serialize;

use bizhub_entity::notification::NotificationType;

use super::threshold::ResolvedThresholds;

/// The widest stock bands across a set of recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockAggregate {
    /// Largest `stock_low` bound among recipients.
    pub max_low: i64,
    /// Largest `stock_medium` bound among recipients.
    pub max_medium: i64,
}

impl Default for StockAggregate {
    fn default() -> Self {
        let defaults = ResolvedThresholds::default();
        Self {
            max_low: defaults.stock_low,
            max_medium: defaults.stock_medium,
        }
    }
}

impl StockAggregate {
    /// Aggregate resolved thresholds; an empty input yields the defaults.
    pub fn from_thresholds(thresholds: impl IntoIterator<Item = ResolvedThresholds>) -> Self {
        thresholds
            .into_iter()
            .fold(None, |acc: Option<Self>, t| {
                Some(match acc {
                    None => Self {
                        max_low: t.stock_low,
                        max_medium: t.stock_medium,
                    },
                    Some(a) => Self {
                        max_low: a.max_low.max(t.stock_low),
                        max_medium: a.max_medium.max(t.stock_medium),
                    },
                })
            })
            .unwrap_or_default()
    }
}

/// Pick the single most severe stock type for `new_quantity`.
///
/// Severity order: `stock_out`, then `stock_low`, then `stock_medium`.
pub fn select_stock_notification(
    new_quantity: i64,
    aggregate: &StockAggregate,
) -> Option<NotificationType> {
    if new_quantity <= 0 {
        Some(NotificationType::StockOut)
    } else if new_quantity <= aggregate.max_low {
        Some(NotificationType::StockLow)
    } else if new_quantity <= aggregate.max_medium {
        Some(NotificationType::StockMedium)
    } else {
        None
    }
}
