//! Typed notification metadata.
//!
//! The metadata of a notification is a tagged union keyed by notification
//! type, so the facts a threshold depends on (an order total, a stock
//! quantity) are always present with the right shape. It is stored as a
//! single JSONB column.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::kind::NotificationType;

/// Facts about an order event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFacts {
    pub order_id: Uuid,
    pub order_number: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub total_amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub previous_status: Option<String>,
}

/// Facts about a stock level change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockFacts {
    pub product_id: Uuid,
    pub product_name: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub quantity: i64,
    #[serde(default)]
    pub previous_quantity: Option<i64>,
}

/// Facts about a newly created product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductFacts {
    pub product_id: Uuid,
    pub product_name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

/// Facts about a newly registered customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerFacts {
    pub customer_id: Uuid,
    pub customer_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Free-form attributes for announcements, maintenance notices and tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneralFacts {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

/// Metadata union, one variant per [`NotificationType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum NotificationMetadata {
    OrderCreated(OrderFacts),
    OrderStatusChanged(OrderFacts),
    OrderCancelled(OrderFacts),
    OrderHighValue(OrderFacts),
    StockLow(StockFacts),
    StockMedium(StockFacts),
    StockOut(StockFacts),
    ProductCreated(ProductFacts),
    CustomerRegistered(CustomerFacts),
    SystemAnnouncement(GeneralFacts),
    Maintenance(GeneralFacts),
    Test(GeneralFacts),
}

impl NotificationMetadata {
    /// The notification type this metadata belongs to.
    pub fn kind(&self) -> NotificationType {
        match self {
            Self::OrderCreated(_) => NotificationType::OrderCreated,
            Self::OrderStatusChanged(_) => NotificationType::OrderStatusChanged,
            Self::OrderCancelled(_) => NotificationType::OrderCancelled,
            Self::OrderHighValue(_) => NotificationType::OrderHighValue,
            Self::StockLow(_) => NotificationType::StockLow,
            Self::StockMedium(_) => NotificationType::StockMedium,
            Self::StockOut(_) => NotificationType::StockOut,
            Self::ProductCreated(_) => NotificationType::ProductCreated,
            Self::CustomerRegistered(_) => NotificationType::CustomerRegistered,
            Self::SystemAnnouncement(_) => NotificationType::SystemAnnouncement,
            Self::Maintenance(_) => NotificationType::Maintenance,
            Self::Test(_) => NotificationType::Test,
        }
    }

    /// Build the general-purpose variant for a general type.
    ///
    /// Returns `None` for types that require structured facts.
    pub fn general(kind: NotificationType, facts: GeneralFacts) -> Option<Self> {
        match kind {
            NotificationType::SystemAnnouncement => Some(Self::SystemAnnouncement(facts)),
            NotificationType::Maintenance => Some(Self::Maintenance(facts)),
            NotificationType::Test => Some(Self::Test(facts)),
            _ => None,
        }
    }

    /// Order facts, if this is an order notification.
    pub fn order(&self) -> Option<&OrderFacts> {
        match self {
            Self::OrderCreated(f)
            | Self::OrderStatusChanged(f)
            | Self::OrderCancelled(f)
            | Self::OrderHighValue(f) => Some(f),
            _ => None,
        }
    }

    /// Stock facts, if this is a stock notification.
    pub fn stock(&self) -> Option<&StockFacts> {
        match self {
            Self::StockLow(f) | Self::StockMedium(f) | Self::StockOut(f) => Some(f),
            _ => None,
        }
    }

    /// The monetary amount a value threshold compares against.
    pub fn amount(&self) -> Option<f64> {
        self.order().map(|f| f.total_amount)
    }

    /// The quantity a stock threshold compares against.
    pub fn quantity(&self) -> Option<i64> {
        self.stock().map(|f| f.quantity)
    }

    /// The business entity this notification is about, as `(type, id)`.
    pub fn related_entity(&self) -> Option<(&'static str, Uuid)> {
        match self {
            Self::OrderCreated(f)
            | Self::OrderStatusChanged(f)
            | Self::OrderCancelled(f)
            | Self::OrderHighValue(f) => Some(("order", f.order_id)),
            Self::StockLow(f) | Self::StockMedium(f) | Self::StockOut(f) => {
                Some(("product", f.product_id))
            }
            Self::ProductCreated(f) => Some(("product", f.product_id)),
            Self::CustomerRegistered(f) => Some(("customer", f.customer_id)),
            Self::SystemAnnouncement(_) | Self::Maintenance(_) | Self::Test(_) => None,
        }
    }

    /// Re-tag stock facts under another stock type.
    pub fn with_stock_kind(facts: StockFacts, kind: NotificationType) -> Option<Self> {
        match kind {
            NotificationType::StockLow => Some(Self::StockLow(facts)),
            NotificationType::StockMedium => Some(Self::StockMedium(facts)),
            NotificationType::StockOut => Some(Self::StockOut(facts)),
            _ => None,
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}
