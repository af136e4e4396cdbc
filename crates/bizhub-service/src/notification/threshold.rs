//! Threshold resolution and the per-recipient eligibility decision.
//!
//! Eligibility is a pure function of the notification type, its metadata
//! and the recipient's resolved thresholds. Resolution turns whatever is
//! stored (possibly nothing, possibly a malformed value) into concrete
//! numbers, always falling back to the default table.

use serde::Serialize;
use tracing::warn;

use bizhub_entity::notification::{
    NotificationMetadata, NotificationPreference, NotificationType, Threshold,
};

/// One recipient's thresholds with defaults applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedThresholds {
    /// Minimum order total for `order_high_value`.
    pub amount: f64,
    /// Upper bound (inclusive) of the `stock_low` band.
    pub stock_low: i64,
    /// Upper bound (inclusive) of the `stock_medium` band.
    pub stock_medium: i64,
}

impl Default for ResolvedThresholds {
    fn default() -> Self {
        Self {
            amount: default_amount(NotificationType::OrderHighValue),
            stock_low: default_quantity(NotificationType::StockLow),
            stock_medium: default_quantity(NotificationType::StockMedium),
        }
    }
}

impl ResolvedThresholds {
    /// Resolve from whichever preferences of one recipient are at hand.
    ///
    /// Preferences of other types are ignored.
    pub fn from_preferences<'a>(
        preferences: impl IntoIterator<Item = &'a NotificationPreference>,
    ) -> Self {
        let mut resolved = Self::default();
        for pref in preferences {
            let Some(threshold) = resolve_threshold(pref.kind, pref.threshold.as_ref()) else {
                continue;
            };
            match pref.kind {
                NotificationType::OrderHighValue => {
                    resolved.amount = threshold.amount().unwrap_or(resolved.amount);
                }
                NotificationType::StockLow => {
                    resolved.stock_low = threshold.quantity().unwrap_or(resolved.stock_low);
                }
                NotificationType::StockMedium => {
                    resolved.stock_medium = threshold.quantity().unwrap_or(resolved.stock_medium);
                }
                _ => {}
            }
        }
        resolved
    }
}

/// The threshold that applies to `kind` given what is stored.
///
/// A stored threshold of the wrong shape for the type is a configuration
/// error: it is logged and the default is used instead.
pub fn resolve_threshold(kind: NotificationType, stored: Option<&Threshold>) -> Option<Threshold> {
    let default = Threshold::default_for(kind)?;
    match stored {
        None => Some(default),
        Some(t) if t.validate_for(kind).is_ok() => Some(*t),
        Some(t) => {
            warn!(
                notification_type = %kind,
                stored = ?t,
                "Stored threshold does not fit its notification type; using default"
            );
            Some(default)
        }
    }
}

/// Whether a recipient with `thresholds` should receive a `kind` notification.
///
/// - `order_high_value`: amount ≥ threshold amount
/// - `stock_low`: 0 < quantity ≤ low
/// - `stock_medium`: low < quantity ≤ medium (empty band when medium ≤ low)
/// - `stock_out`: quantity ≤ 0
/// - any other type: always eligible
///
/// Metadata lacking the facts a threshold needs is never eligible.
pub fn eligible(
    kind: NotificationType,
    metadata: &NotificationMetadata,
    thresholds: &ResolvedThresholds,
) -> bool {
    match kind {
        NotificationType::OrderHighValue => metadata
            .amount()
            .is_some_and(|amount| amount >= thresholds.amount),
        NotificationType::StockLow => metadata
            .quantity()
            .is_some_and(|q| q > 0 && q <= thresholds.stock_low),
        NotificationType::StockMedium => metadata.quantity().is_some_and(|q| {
            thresholds.stock_medium > thresholds.stock_low
                && q > thresholds.stock_low
                && q <= thresholds.stock_medium
        }),
        NotificationType::StockOut => metadata.quantity().is_some_and(|q| q <= 0),
        _ => true,
    }
}

fn default_amount(kind: NotificationType) -> f64 {
    Threshold::default_for(kind)
        .and_then(|t| t.amount())
        .unwrap_or_default()
}

fn default_quantity(kind: NotificationType) -> i64 {
    Threshold::default_for(kind)
        .and_then(|t| t.quantity())
        .unwrap_or_default()
}
