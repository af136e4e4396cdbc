//! # bizhub-service
//!
//! Business logic for BizHub notifications: fan-out, preferences,
//! read state, email delivery, business-event triggers and admin
//! operations.

pub mod context;
pub mod notification;

pub use context::RequestContext;
pub use notification::{
    EmailChannel, FanOutOutcome, MarkAllReadResult, MarkReadResult, NotificationAdminService,
    NotificationOrchestrator, NotificationServices, NotificationSpec, NotificationTriggers,
    PreferenceService, ReadStateManager, RealtimeChannel, RealtimeEvent, RecipientResolver,
};
