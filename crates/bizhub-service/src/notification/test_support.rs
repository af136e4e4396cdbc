//! In-memory wiring shared by the service tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use bizhub_core::config::{EmailConfig, NotificationsConfig};
use bizhub_core::error::AppError;
use bizhub_core::result::AppResult;
use bizhub_database::Stores;
use bizhub_database::memory::MemoryUserDirectory;
use bizhub_entity::user::{User, UserRole};

use super::channel::{RealtimeChannel, RealtimeEvent};
use super::email::{EmailChannel, EmailMessage, EmailTemplates, EmailTransport};
use super::NotificationServices;

/// Records pushed events per user.
#[derive(Debug, Default)]
pub(crate) struct RecordingChannel {
    events: Mutex<Vec<(Uuid, RealtimeEvent)>>,
}

impl RecordingChannel {
    pub fn events_for(&self, user_id: Uuid) -> Vec<RealtimeEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, event)| event.clone())
            .collect()
    }
}

impl RealtimeChannel for RecordingChannel {
    fn send_to_user(&self, user_id: Uuid, event: RealtimeEvent) -> usize {
        self.events.lock().unwrap().push((user_id, event));
        1
    }

    fn send_to_role(&self, _role: UserRole, _event: RealtimeEvent) -> usize {
        0
    }
}

/// Captures messages instead of sending them.
#[derive(Debug, Default)]
pub(crate) struct RecordingTransport {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl RecordingTransport {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailTransport for RecordingTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        if self.fail {
            return Err(AppError::external_service("relay down"));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Services over memory stores with recording channels.
pub(crate) struct Fixture {
    pub stores: Stores,
    pub users: Arc<MemoryUserDirectory>,
    pub realtime: Arc<RecordingChannel>,
    pub transport: Arc<RecordingTransport>,
    pub services: NotificationServices,
}

impl Fixture {
    pub fn new() -> Self {
        let users = Arc::new(MemoryUserDirectory::new());
        let stores = Stores::memory(Arc::clone(&users));
        let realtime = Arc::new(RecordingChannel::default());
        let transport = Arc::new(RecordingTransport::default());
        let email = EmailChannel::new(
            Arc::new(EmailTemplates::builtin("en")),
            transport.clone(),
            Arc::clone(&stores.notifications),
            EmailConfig::default(),
        );
        let services = NotificationServices::with_email(
            &stores,
            realtime.clone(),
            email,
            &NotificationsConfig::default(),
        );
        Self {
            stores,
            users,
            realtime,
            transport,
            services,
        }
    }

    /// Add an active user with an email address.
    pub fn user(&self, username: &str, role: UserRole) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: Some(format!("{username}@example.com")),
            display_name: None,
            role,
            is_active: true,
            created_at: Utc::now(),
        };
        self.users.upsert(user.clone());
        user
    }

    pub async fn unread(&self, user_id: Uuid) -> u64 {
        self.services.read_state.unread_count(user_id).await.unwrap()
    }
}
