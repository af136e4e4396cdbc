//! Notification preference entity and the default threshold table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bizhub_core::AppError;

use super::kind::{NotificationType, ThresholdKind};

/// A structured per-recipient threshold.
///
/// Serialized as `{ "quantity": n }` for stock types and
/// `{ "amount": x }` for value types.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    Quantity { quantity: i64 },
    Amount { amount: f64 },
}

impl Threshold {
    /// The shape of this threshold.
    pub fn kind(&self) -> ThresholdKind {
        match self {
            Self::Quantity { .. } => ThresholdKind::Quantity,
            Self::Amount { .. } => ThresholdKind::Amount,
        }
    }

    /// The quantity bound, if this is a quantity threshold.
    pub fn quantity(&self) -> Option<i64> {
        match self {
            Self::Quantity { quantity } => Some(*quantity),
            Self::Amount { .. } => None,
        }
    }

    /// The amount bound, if this is an amount threshold.
    pub fn amount(&self) -> Option<f64> {
        match self {
            Self::Amount { amount } => Some(*amount),
            Self::Quantity { .. } => None,
        }
    }

    /// Check this threshold is acceptable for `kind`.
    ///
    /// Rejects negative values, non-finite amounts, thresholds on types that
    /// take none, and a shape that does not match the type.
    pub fn validate_for(&self, kind: NotificationType) -> Result<(), AppError> {
        let Some(expected) = kind.threshold_kind() else {
            return Err(AppError::validation(format!(
                "Notification type '{kind}' does not accept a threshold"
            )));
        };
        if self.kind() != expected {
            return Err(AppError::validation(format!(
                "Notification type '{kind}' expects a {} threshold",
                match expected {
                    ThresholdKind::Quantity => "quantity",
                    ThresholdKind::Amount => "amount",
                }
            )));
        }
        match *self {
            Self::Quantity { quantity } if quantity < 0 => Err(AppError::validation(format!(
                "Threshold quantity must not be negative (got {quantity})"
            ))),
            Self::Amount { amount } if !amount.is_finite() || amount < 0.0 => {
                Err(AppError::validation(format!(
                    "Threshold amount must be a non-negative number (got {amount})"
                )))
            }
            _ => Ok(()),
        }
    }

    /// The default threshold for `kind`, if the type is configurable.
    pub fn default_for(kind: NotificationType) -> Option<Threshold> {
        DEFAULT_THRESHOLDS
            .iter()
            .find(|d| d.kind == kind)
            .map(|d| d.threshold)
    }
}

/// One entry of the default threshold table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DefaultThreshold {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub threshold: Threshold,
}

/// The single source of default thresholds.
pub const DEFAULT_THRESHOLDS: [DefaultThreshold; 3] = [
    DefaultThreshold {
        kind: NotificationType::OrderHighValue,
        threshold: Threshold::Amount { amount: 1000.0 },
    },
    DefaultThreshold {
        kind: NotificationType::StockLow,
        threshold: Threshold::Quantity { quantity: 5 },
    },
    DefaultThreshold {
        kind: NotificationType::StockMedium,
        threshold: Threshold::Quantity { quantity: 10 },
    },
];

/// Per-(user, type) delivery preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPreference {
    /// The user these preferences belong to.
    pub user_id: Uuid,
    /// The notification type they apply to.
    #[serde(rename = "type")]
    pub kind: NotificationType,
    /// Deliver in-app (stored row plus realtime push).
    pub in_app_enabled: bool,
    /// Deliver by email.
    pub email_enabled: bool,
    /// Optional threshold overriding the type default.
    pub threshold: Option<Threshold>,
    /// Preferred language for email templates and localized text.
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationPreference {
    /// Default preferences for one user and type.
    pub fn defaults(
        user_id: Uuid,
        kind: NotificationType,
        language: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            kind,
            in_app_enabled: true,
            email_enabled: false,
            threshold: None,
            language: language.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_shapes() {
        let q: Threshold = serde_json::from_str(r#"{"quantity": 5}"#).unwrap();
        assert_eq!(q, Threshold::Quantity { quantity: 5 });
        let a: Threshold = serde_json::from_str(r#"{"amount": 1000}"#).unwrap();
        assert_eq!(a, Threshold::Amount { amount: 1000.0 });
        assert!(serde_json::from_str::<Threshold>(r#"{"level": 5}"#).is_err());
    }

    #[test]
    fn test_validate_for() {
        let low = Threshold::Quantity { quantity: 3 };
        assert!(low.validate_for(NotificationType::StockLow).is_ok());
        assert!(low.validate_for(NotificationType::OrderHighValue).is_err());
        assert!(low.validate_for(NotificationType::StockOut).is_err());

        let negative = Threshold::Quantity { quantity: -1 };
        assert!(negative.validate_for(NotificationType::StockLow).is_err());

        let amount = Threshold::Amount { amount: -0.5 };
        assert!(amount.validate_for(NotificationType::OrderHighValue).is_err());
    }

    #[test]
    fn test_defaults_table() {
        assert_eq!(
            Threshold::default_for(NotificationType::StockLow),
            Some(Threshold::Quantity { quantity: 5 })
        );
        assert_eq!(
            Threshold::default_for(NotificationType::StockMedium),
            Some(Threshold::Quantity { quantity: 10 })
        );
        assert_eq!(
            Threshold::default_for(NotificationType::OrderHighValue),
            Some(Threshold::Amount { amount: 1000.0 })
        );
        assert_eq!(Threshold::default_for(NotificationType::OrderCreated), None);
        for entry in DEFAULT_THRESHOLDS {
            entry.threshold.validate_for(entry.kind).unwrap();
        }
    }

    #[test]
    fn test_preference_defaults() {
        let p = NotificationPreference::defaults(
            Uuid::new_v4(),
            NotificationType::StockLow,
            "en",
            Utc::now(),
        );
        assert!(p.in_app_enabled);
        assert!(!p.email_enabled);
        assert!(p.threshold.is_none());
    }
}
