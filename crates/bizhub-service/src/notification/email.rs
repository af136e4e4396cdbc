//! Email delivery: `(type, language)` templates and pluggable transports.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use minijinja::Environment;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use bizhub_core::config::{EmailConfig, EmailTransportKind};
use bizhub_core::error::{AppError, ErrorKind};
use bizhub_core::result::AppResult;
use bizhub_database::NotificationStore;
use bizhub_entity::notification::{Notification, NotificationType};
use bizhub_entity::user::User;

/// A rendered email ready for a transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub notification_id: Uuid,
    pub user_id: Uuid,
}

/// Hands a rendered email to something that sends it.
#[async_trait]
pub trait EmailTransport: Send + Sync + std::fmt::Debug {
    /// Short transport name for logs.
    fn name(&self) -> &'static str;

    /// Send one message.
    async fn send(&self, message: &EmailMessage) -> AppResult<()>;
}

/// Writes rendered messages to the log.
#[derive(Debug, Clone, Default)]
pub struct LogTransport;

#[async_trait]
impl EmailTransport for LogTransport {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            notification_id = %message.notification_id,
            body = %message.body,
            "Email (log transport)"
        );
        Ok(())
    }
}

/// POSTs rendered messages as JSON to an HTTP mail relay.
#[derive(Debug, Clone)]
pub struct WebhookTransport {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl WebhookTransport {
    /// Build a relay client with the configured timeout.
    pub fn new(url: String, token: Option<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build email client", e)
            })?;
        Ok(Self { client, url, token })
    }
}

#[async_trait]
impl EmailTransport for WebhookTransport {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        let mut request = self.client.post(&self.url).json(message);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            AppError::with_source(ErrorKind::ExternalService, "Mail relay request failed", e)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::external_service(format!(
                "Mail relay responded with {status}"
            )));
        }
        debug!(url = %self.url, status = %status, "Mail relay accepted message");
        Ok(())
    }
}

/// Template source for one `(type, language)` pair.
#[derive(Debug, Clone)]
struct TemplateSource {
    subject: String,
    body: String,
}

/// Values exposed to email templates.
#[derive(Debug, Serialize)]
struct TemplateContext<'a> {
    title: &'a str,
    message: &'a str,
    priority: &'a str,
    notification_type: &'a str,
    recipient_name: &'a str,
    username: &'a str,
    related_type: Option<&'a str>,
    related_id: Option<Uuid>,
    metadata: &'a bizhub_entity::notification::NotificationMetadata,
    created_at: String,
}

const GENERIC_EN_BODY: &str = "Hello {{ recipient_name }},\n\n{{ message }}\n\nPriority: {{ priority }}\n\n- BizHub";

const GENERIC_AR_BODY: &str = "مرحباً {{ recipient_name }}،\n\n{{ message }}\n\n- BizHub";

/// Built-in templates: `(type, language, subject, body)`.
fn builtin_templates() -> Vec<(NotificationType, &'static str, &'static str, &'static str)> {
    let mut templates: Vec<_> = NotificationType::ALL
        .into_iter()
        .map(|kind| (kind, "en", "[BizHub] {{ title }}", GENERIC_EN_BODY))
        .collect();

    templates.extend([
        (
            NotificationType::OrderHighValue,
            "en",
            "[BizHub] High-value order {{ metadata.data.order_number }}",
            "Hello {{ recipient_name }},\n\nOrder {{ metadata.data.order_number }} totals {{ metadata.data.total_amount }} {{ metadata.data.currency }}.\n\n{{ message }}\n\n- BizHub",
        ),
        (
            NotificationType::StockOut,
            "en",
            "[BizHub] Out of stock: {{ metadata.data.product_name }}",
            "Hello {{ recipient_name }},\n\n{{ metadata.data.product_name }} is out of stock.\n\n{{ message }}\n\n- BizHub",
        ),
        (
            NotificationType::StockLow,
            "en",
            "[BizHub] Low stock: {{ metadata.data.product_name }}",
            "Hello {{ recipient_name }},\n\n{{ metadata.data.product_name }} is down to {{ metadata.data.quantity }} units.\n\n{{ message }}\n\n- BizHub",
        ),
        (NotificationType::SystemAnnouncement, "ar", "[BizHub] {{ title }}", GENERIC_AR_BODY),
        (NotificationType::Maintenance, "ar", "[BizHub] صيانة: {{ title }}", GENERIC_AR_BODY),
        (NotificationType::Test, "ar", "[BizHub] {{ title }}", GENERIC_AR_BODY),
    ]);
    templates
}

/// `(type, language)` email templates rendered with minijinja.
pub struct EmailTemplates {
    env: Environment<'static>,
    sources: HashMap<(NotificationType, String), TemplateSource>,
    default_language: String,
}

impl std::fmt::Debug for EmailTemplates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailTemplates")
            .field("templates", &self.sources.len())
            .field("default_language", &self.default_language)
            .finish()
    }
}

impl EmailTemplates {
    /// An empty template set.
    pub fn empty(default_language: impl Into<String>) -> Self {
        Self {
            env: Environment::new(),
            sources: HashMap::new(),
            default_language: default_language.into(),
        }
    }

    /// The built-in template set.
    pub fn builtin(default_language: impl Into<String>) -> Self {
        let mut templates = Self::empty(default_language);
        for (kind, language, subject, body) in builtin_templates() {
            templates.insert(kind, language, subject, body);
        }
        templates
    }

    /// Add or replace the template for `(kind, language)`.
    pub fn insert(
        &mut self,
        kind: NotificationType,
        language: &str,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) {
        self.sources.insert(
            (kind, language.to_string()),
            TemplateSource {
                subject: subject.into(),
                body: body.into(),
            },
        );
    }

    /// Pick the template for `language`, falling back to the default language.
    ///
    /// Returns the language actually used alongside the template.
    fn lookup(&self, kind: NotificationType, language: &str) -> Option<(&str, &TemplateSource)> {
        self.sources
            .get_key_value(&(kind, language.to_string()))
            .or_else(|| {
                self.sources
                    .get_key_value(&(kind, self.default_language.clone()))
            })
            .map(|((_, lang), source)| (lang.as_str(), source))
    }

    /// Render subject and body, or `None` when no template exists.
    pub fn render(
        &self,
        notification: &Notification,
        recipient: &User,
        language: &str,
    ) -> Option<AppResult<(String, String)>> {
        let (used_language, source) = self.lookup(notification.kind, language)?;

        let ctx = TemplateContext {
            title: notification.title_for(used_language),
            message: notification.message_for(used_language),
            priority: notification.priority.as_str(),
            notification_type: notification.kind.as_str(),
            recipient_name: recipient.name(),
            username: &recipient.username,
            related_type: notification.related_type.as_deref(),
            related_id: notification.related_id,
            metadata: &notification.metadata,
            created_at: notification.created_at.to_rfc3339(),
        };

        let render = |template: &str| {
            self.env.render_str(template, &ctx).map_err(|e| {
                AppError::with_source(ErrorKind::Internal, "Failed to render email template", e)
            })
        };

        Some(render(&source.subject).and_then(|subject| Ok((subject, render(&source.body)?))))
    }
}

/// Sends notification emails and records the email markers.
#[derive(Debug, Clone)]
pub struct EmailChannel {
    templates: Arc<EmailTemplates>,
    transport: Arc<dyn EmailTransport>,
    store: Arc<dyn NotificationStore>,
    config: EmailConfig,
}

impl EmailChannel {
    /// Creates an email channel with an explicit transport.
    pub fn new(
        templates: Arc<EmailTemplates>,
        transport: Arc<dyn EmailTransport>,
        store: Arc<dyn NotificationStore>,
        config: EmailConfig,
    ) -> Self {
        Self {
            templates,
            transport,
            store,
            config,
        }
    }

    /// Build the transport named by `config` with the built-in templates.
    pub fn from_config(
        config: EmailConfig,
        default_language: &str,
        store: Arc<dyn NotificationStore>,
    ) -> AppResult<Self> {
        let transport: Arc<dyn EmailTransport> = match config.transport {
            EmailTransportKind::Log => Arc::new(LogTransport),
            EmailTransportKind::Webhook => {
                let url = config.webhook_url.clone().ok_or_else(|| {
                    AppError::configuration("email.webhook_url is required for the webhook transport")
                })?;
                Arc::new(WebhookTransport::new(
                    url,
                    config.webhook_token.clone(),
                    Duration::from_secs(config.timeout_seconds),
                )?)
            }
        };
        info!(
            transport = transport.name(),
            enabled = config.enabled,
            "Email channel configured"
        );
        Ok(Self::new(
            Arc::new(EmailTemplates::builtin(default_language)),
            transport,
            store,
            config,
        ))
    }

    /// Send `notification` to `recipient` in `language`.
    ///
    /// Never fails: every problem is logged and reported as `false`.
    pub async fn send(&self, notification: &Notification, recipient: &User, language: &str) -> bool {
        if !self.config.enabled {
            debug!(notification_id = %notification.id, "Email channel disabled");
            return false;
        }
        let Some(to) = recipient.email.as_deref().filter(|e| !e.is_empty()) else {
            debug!(user_id = %recipient.id, "Recipient has no email address");
            return false;
        };

        let (subject, body) = match self.templates.render(notification, recipient, language) {
            None => {
                warn!(
                    notification_type = %notification.kind,
                    language,
                    "No email template for notification type"
                );
                return false;
            }
            Some(Err(e)) => {
                warn!(notification_id = %notification.id, error = %e, "Email rendering failed");
                return false;
            }
            Some(Ok(rendered)) => rendered,
        };

        let message = EmailMessage {
            from: self.config.from_address.clone(),
            to: to.to_string(),
            subject,
            body,
            notification_id: notification.id,
            user_id: recipient.id,
        };

        if let Err(e) = self.transport.send(&message).await {
            warn!(
                notification_id = %notification.id,
                user_id = %recipient.id,
                transport = self.transport.name(),
                error = %e,
                "Email delivery failed"
            );
            return false;
        }

        let now = Utc::now();
        if let Err(e) = self
            .store
            .mark_delivery_email_sent(notification.id, recipient.id, now)
            .await
        {
            warn!(notification_id = %notification.id, error = %e, "Failed to record delivery email marker");
        }
        if let Err(e) = self.store.mark_notification_email_sent(notification.id).await {
            warn!(notification_id = %notification.id, error = %e, "Failed to record notification email marker");
        }

        debug!(
            notification_id = %notification.id,
            user_id = %recipient.id,
            "Email sent"
        );
        true
    }
}
