//! Notification type enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of notification types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// A new order was placed.
    OrderCreated,
    /// An order moved to a new status.
    OrderStatusChanged,
    /// An order was cancelled.
    OrderCancelled,
    /// An order's total crossed a recipient's amount threshold.
    OrderHighValue,
    /// Stock fell into the low band.
    StockLow,
    /// Stock fell into the medium band.
    StockMedium,
    /// Stock is depleted.
    StockOut,
    /// A product was added to the catalogue.
    ProductCreated,
    /// A customer account was registered.
    CustomerRegistered,
    /// Free-form announcement from an administrator.
    SystemAnnouncement,
    /// Planned maintenance notice.
    Maintenance,
    /// Test message sent by an administrator to themselves.
    Test,
}

/// Which shape of threshold a type accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKind {
    /// `{ "quantity": n }`
    Quantity,
    /// `{ "amount": x }`
    Amount,
}

impl NotificationType {
    /// Every type, in declaration order.
    pub const ALL: [NotificationType; 12] = [
        Self::OrderCreated,
        Self::OrderStatusChanged,
        Self::OrderCancelled,
        Self::OrderHighValue,
        Self::StockLow,
        Self::StockMedium,
        Self::StockOut,
        Self::ProductCreated,
        Self::CustomerRegistered,
        Self::SystemAnnouncement,
        Self::Maintenance,
        Self::Test,
    ];

    /// Return the type as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderCreated => "order_created",
            Self::OrderStatusChanged => "order_status_changed",
            Self::OrderCancelled => "order_cancelled",
            Self::OrderHighValue => "order_high_value",
            Self::StockLow => "stock_low",
            Self::StockMedium => "stock_medium",
            Self::StockOut => "stock_out",
            Self::ProductCreated => "product_created",
            Self::CustomerRegistered => "customer_registered",
            Self::SystemAnnouncement => "system_announcement",
            Self::Maintenance => "maintenance",
            Self::Test => "test",
        }
    }

    /// The threshold shape this type accepts, if it is configurable.
    pub fn threshold_kind(&self) -> Option<ThresholdKind> {
        match self {
            Self::OrderHighValue => Some(ThresholdKind::Amount),
            Self::StockLow | Self::StockMedium => Some(ThresholdKind::Quantity),
            _ => None,
        }
    }

    /// Types an administrator may send through the broadcast endpoint.
    pub fn is_general(&self) -> bool {
        matches!(self, Self::SystemAnnouncement | Self::Maintenance)
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = bizhub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                bizhub_core::AppError::validation(format!("Invalid notification type: '{s}'"))
            })
    }
}
