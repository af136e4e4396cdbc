//! Cross-origin access for the BizHub web client.
//!
//! The inbox UI is usually served from another origin than the API, and it
//! only ever sends JSON with a bearer token.

use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use bizhub_core::config::CorsConfig;

/// Methods the notification routes are mounted with.
const ROUTE_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

/// Builds the CORS layer wrapped around the router.
pub fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(ROUTE_METHODS)
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(config.max_age_seconds));

    match parse_origins(&config.allowed_origins) {
        None => layer.allow_origin(Any),
        Some(origins) => layer.allow_origin(origins),
    }
}

/// `None` when a `*` entry opens the API to any origin. Otherwise only the
/// parseable origins are kept and the rest are reported.
fn parse_origins(configured: &[String]) -> Option<Vec<HeaderValue>> {
    if configured.iter().any(|o| o == "*") {
        return None;
    }

    let origins: Vec<HeaderValue> = configured
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    Some(origins)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(origins: &[&str]) -> Vec<String> {
        origins.iter().map(|o| o.to_string()).collect()
    }

    #[test]
    fn test_wildcard_allows_any_origin() {
        assert!(parse_origins(&owned(&["https://app.example", "*"])).is_none());
    }

    #[test]
    fn test_unparseable_origin_dropped() {
        let origins = parse_origins(&owned(&["https://app.example", "bad\norigin"])).unwrap();
        assert_eq!(origins, vec![HeaderValue::from_static("https://app.example")]);
    }
}
