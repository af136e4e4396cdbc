//! Aggregated notification statistics for administrators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::kind::NotificationType;
use super::priority::NotificationPriority;

/// Number of notifications of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub count: u64,
}

/// Number of notifications of one priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCount {
    pub priority: NotificationPriority,
    pub count: u64,
}

/// Statistics over notifications created in `[from, to)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationStatistics {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total_notifications: u64,
    pub by_type: Vec<TypeCount>,
    pub by_priority: Vec<PriorityCount>,
    pub total_deliveries: u64,
    pub read_deliveries: u64,
    pub emails_sent: u64,
    /// `read_deliveries / total_deliveries`, 0 when nothing was delivered.
    pub read_rate: f64,
}

impl NotificationStatistics {
    /// Ratio of read deliveries, guarding the empty case.
    pub fn compute_read_rate(read: u64, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            read as f64 / total as f64
        }
    }
}
