//! Email channel configuration.

use serde::{Deserialize, Serialize};

/// How rendered emails leave the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailTransportKind {
    /// Write the rendered message to the log only.
    #[default]
    Log,
    /// POST the rendered message as JSON to an HTTP mail relay.
    Webhook,
}

/// Email channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Global kill switch for the email channel.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Transport implementation.
    #[serde(default)]
    pub transport: EmailTransportKind,
    /// Sender address.
    #[serde(default = "default_from")]
    pub from_address: String,
    /// Mail relay endpoint (webhook transport).
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Bearer token sent to the relay, if any.
    #[serde(default)]
    pub webhook_token: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            transport: EmailTransportKind::default(),
            from_address: default_from(),
            webhook_url: None,
            webhook_token: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_from() -> String {
    "notifications@bizhub.local".to_string()
}

fn default_timeout() -> u64 {
    10
}
