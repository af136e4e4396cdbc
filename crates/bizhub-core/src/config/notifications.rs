//! Notification fan-out and preference configuration.

use serde::{Deserialize, Serialize};

/// Fan-out and preference settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Maximum recipients processed concurrently during fan-out.
    #[serde(default = "default_fanout_concurrency")]
    pub fanout_concurrency: usize,
    /// Language assigned to freshly created preferences.
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Languages a preference may select.
    #[serde(default = "default_supported_languages")]
    pub supported_languages: Vec<String>,
    /// Page size used when a list request omits `per_page`.
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            fanout_concurrency: default_fanout_concurrency(),
            default_language: default_language(),
            supported_languages: default_supported_languages(),
            default_page_size: default_page_size(),
        }
    }
}

fn default_fanout_concurrency() -> usize {
    16
}

fn default_language() -> String {
    "en".to_string()
}

fn default_supported_languages() -> Vec<String> {
    vec!["en".to_string(), "ar".to_string()]
}

fn default_page_size() -> u64 {
    crate::types::pagination::DEFAULT_PAGE_SIZE
}
