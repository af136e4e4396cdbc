//! Business-event adapters.
//!
//! Controllers call these after their own writes commit. Every method
//! returns `()`: failures are logged here and never reach the caller.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use bizhub_core::result::AppResult;
use bizhub_entity::notification::{
    CustomerFacts, NotificationMetadata, NotificationPriority, NotificationType, OrderFacts,
    ProductFacts, StockFacts,
};

use super::orchestrator::{FanOutOutcome, NotificationOrchestrator, NotificationSpec};
use super::recipients::Targeting;
use super::stock::select_stock_notification;

const CANCELLED_STATUS: &str = "cancelled";

/// An order as seen by the notification engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: Uuid,
    pub order_number: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub total_amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub status: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl OrderEvent {
    fn facts(&self, previous_status: Option<&str>) -> OrderFacts {
        OrderFacts {
            order_id: self.order_id,
            order_number: self.order_number.clone(),
            customer_name: self.customer_name.clone(),
            total_amount: self.total_amount,
            currency: self.currency.clone(),
            status: self.status.clone(),
            previous_status: previous_status.map(str::to_string),
        }
    }
}

/// A product's stock level moving from one quantity to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChangeEvent {
    pub product_id: Uuid,
    pub product_name: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub previous_quantity: i64,
    pub new_quantity: i64,
}

/// A newly created product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductEvent {
    pub product_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

/// A newly registered customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerEvent {
    pub customer_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Turns business events into notifications.
#[derive(Debug, Clone)]
pub struct NotificationTriggers {
    orchestrator: NotificationOrchestrator,
}

impl NotificationTriggers {
    /// Creates the trigger adapters.
    pub fn new(orchestrator: NotificationOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Run a trigger detached from the caller's task.
    ///
    /// ```ignore
    /// triggers.spawn(move |t| async move { t.order_created(&order, Some(actor)).await });
    /// ```
    pub fn spawn<F, Fut>(&self, trigger: F)
    where
        F: FnOnce(NotificationTriggers) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(trigger(self.clone()));
    }

    /// A new order: `order_created`, plus `order_high_value` when the total
    /// reaches the most permissive amount threshold among order recipients.
    pub async fn order_created(&self, order: &OrderEvent, actor: Option<Uuid>) {
        let spec = NotificationSpec::new(
            NotificationMetadata::OrderCreated(order.facts(None)),
            format!("New order {}", order.order_number),
            format!(
                "Order {} was placed{} for {:.2} {}.",
                order.order_number,
                customer_suffix(order.customer_name.as_deref()),
                order.total_amount,
                order.currency
            ),
        )
        .localized(
            "ar",
            format!("طلب جديد {}", order.order_number),
            format!(
                "تم إنشاء الطلب {} بقيمة {:.2} {}.",
                order.order_number, order.total_amount, order.currency
            ),
        )
        .targeting(Targeting::type_default())
        .created_by(actor);
        report("order_created", self.orchestrator.create_notification(spec).await);

        match self.high_value_applies(order).await {
            Ok(true) => {
                let spec = NotificationSpec::new(
                    NotificationMetadata::OrderHighValue(order.facts(None)),
                    format!("High-value order {}", order.order_number),
                    format!(
                        "Order {} totals {:.2} {}.",
                        order.order_number, order.total_amount, order.currency
                    ),
                )
                .localized(
                    "ar",
                    format!("طلب عالي القيمة {}", order.order_number),
                    format!(
                        "إجمالي الطلب {} هو {:.2} {}.",
                        order.order_number, order.total_amount, order.currency
                    ),
                )
                .priority(NotificationPriority::High)
                .targeting(Targeting::type_default())
                .created_by(actor);
                report(
                    "order_high_value",
                    self.orchestrator.create_notification(spec).await,
                );
            }
            Ok(false) => {
                debug!(order_id = %order.order_id, "Order below every high-value threshold");
            }
            Err(e) => {
                error!(order_id = %order.order_id, error = %e, "High-value check failed");
            }
        }
    }

    async fn high_value_applies(&self, order: &OrderEvent) -> AppResult<bool> {
        let recipients = self
            .orchestrator
            .resolver()
            .resolve(NotificationType::OrderHighValue, &Targeting::type_default())
            .await?;
        let min_amount = self
            .orchestrator
            .preferences()
            .min_amount_threshold(&recipients)
            .await?;
        Ok(order.total_amount >= min_amount)
    }

    /// An order changed status; `cancelled` produces `order_cancelled`.
    pub async fn order_status_changed(
        &self,
        order: &OrderEvent,
        previous_status: &str,
        actor: Option<Uuid>,
    ) {
        if order.status.eq_ignore_ascii_case(previous_status) {
            debug!(order_id = %order.order_id, status = %order.status, "Order status unchanged");
            return;
        }

        let facts = order.facts(Some(previous_status));
        let spec = if order.status.eq_ignore_ascii_case(CANCELLED_STATUS) {
            NotificationSpec::new(
                NotificationMetadata::OrderCancelled(facts),
                format!("Order {} cancelled", order.order_number),
                format!("Order {} was cancelled.", order.order_number),
            )
            .localized(
                "ar",
                format!("تم إلغاء الطلب {}", order.order_number),
                format!("تم إلغاء الطلب {}.", order.order_number),
            )
            .priority(NotificationPriority::High)
        } else {
            NotificationSpec::new(
                NotificationMetadata::OrderStatusChanged(facts),
                format!("Order {} is {}", order.order_number, order.status),
                format!(
                    "Order {} moved from {} to {}.",
                    order.order_number, previous_status, order.status
                ),
            )
        };

        let spec = spec.targeting(Targeting::type_default()).created_by(actor);
        report(
            "order_status_changed",
            self.orchestrator.create_notification(spec).await,
        );
    }

    /// A stock level changed; at most one stock notification is created.
    pub async fn stock_changed(&self, change: &StockChangeEvent, actor: Option<Uuid>) {
        if change.previous_quantity == change.new_quantity {
            debug!(product_id = %change.product_id, "Stock quantity unchanged");
            return;
        }
        report("stock_changed", self.stock_notification(change, actor).await);
    }

    async fn stock_notification(
        &self,
        change: &StockChangeEvent,
        actor: Option<Uuid>,
    ) -> AppResult<Option<FanOutOutcome>> {
        let recipients = self
            .orchestrator
            .resolver()
            .resolve(NotificationType::StockLow, &Targeting::type_default())
            .await?;
        let aggregate = self
            .orchestrator
            .preferences()
            .stock_aggregate(&recipients)
            .await?;

        let Some(kind) = select_stock_notification(change.new_quantity, &aggregate) else {
            debug!(
                product_id = %change.product_id,
                quantity = change.new_quantity,
                "Stock above every band"
            );
            return Ok(None);
        };

        let facts = StockFacts {
            product_id: change.product_id,
            product_name: change.product_name.clone(),
            sku: change.sku.clone(),
            quantity: change.new_quantity,
            previous_quantity: Some(change.previous_quantity),
        };
        let Some(metadata) = NotificationMetadata::with_stock_kind(facts, kind) else {
            return Ok(None);
        };

        let name = &change.product_name;
        let qty = change.new_quantity;
        let spec = match kind {
            NotificationType::StockOut => NotificationSpec::new(
                metadata,
                format!("{name} is out of stock"),
                format!("{name} has no units left."),
            )
            .localized("ar", format!("نفد مخزون {name}"), format!("لم يتبق أي وحدة من {name}."))
            .priority(NotificationPriority::Critical),
            NotificationType::StockLow => NotificationSpec::new(
                metadata,
                format!("Low stock: {name}"),
                format!("{name} is down to {qty} units."),
            )
            .localized("ar", format!("مخزون منخفض: {name}"), format!("تبقى {qty} وحدة من {name}."))
            .priority(NotificationPriority::High),
            _ => NotificationSpec::new(
                metadata,
                format!("Stock running down: {name}"),
                format!("{name} is at {qty} units."),
            )
            .localized("ar", format!("المخزون يتناقص: {name}"), format!("تبقى {qty} وحدة من {name}.")),
        };

        let spec = spec.targeting(Targeting::type_default()).created_by(actor);
        self.orchestrator.create_notification(spec).await.map(Some)
    }

    /// A product was created.
    pub async fn product_created(&self, product: &ProductEvent, actor: Option<Uuid>) {
        let facts = ProductFacts {
            product_id: product.product_id,
            product_name: product.name.clone(),
            sku: product.sku.clone(),
            price: product.price,
        };
        let spec = NotificationSpec::new(
            NotificationMetadata::ProductCreated(facts),
            format!("New product: {}", product.name),
            format!("{} was added to the catalog.", product.name),
        )
        .localized(
            "ar",
            format!("منتج جديد: {}", product.name),
            format!("تمت إضافة {} إلى الكتالوج.", product.name),
        )
        .priority(NotificationPriority::Low)
        .targeting(Targeting::type_default())
        .created_by(actor);
        report("product_created", self.orchestrator.create_notification(spec).await);
    }

    /// A customer registered.
    pub async fn customer_registered(&self, customer: &CustomerEvent, actor: Option<Uuid>) {
        let facts = CustomerFacts {
            customer_id: customer.customer_id,
            customer_name: customer.name.clone(),
            email: customer.email.clone(),
        };
        let spec = NotificationSpec::new(
            NotificationMetadata::CustomerRegistered(facts),
            format!("New customer: {}", customer.name),
            format!("{} registered as a customer.", customer.name),
        )
        .localized(
            "ar",
            format!("عميل جديد: {}", customer.name),
            format!("تم تسجيل {} كعميل.", customer.name),
        )
        .priority(NotificationPriority::Low)
        .targeting(Targeting::type_default())
        .created_by(actor);
        report(
            "customer_registered",
            self.orchestrator.create_notification(spec).await,
        );
    }
}

fn customer_suffix(customer: Option<&str>) -> String {
    customer.map(|c| format!(" by {c}")).unwrap_or_default()
}

/// Log the outcome of a trigger; errors stop here.
fn report<T: Into<Option<FanOutOutcome>>>(trigger: &'static str, result: AppResult<T>) {
    match result.map(Into::into) {
        Ok(Some(outcome)) => debug!(
            trigger,
            notification_id = %outcome.notification.id,
            deliveries = outcome.deliveries.len(),
            "Trigger completed"
        ),
        Ok(None) => debug!(trigger, "Trigger produced no notification"),
        Err(e) => error!(trigger, error = %e, "Notification trigger failed"),
    }
}
