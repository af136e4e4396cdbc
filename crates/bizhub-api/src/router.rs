//! Route definitions for the BizHub HTTP API.
//!
//! REST routes are mounted under `/api`; the WebSocket endpoint lives at `/ws`.

use axum::Router;
use axum::routing::{delete, get, post, put};

use crate::handlers;
use crate::state::AppState;

/// Build the router with all routes, without middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(notification_routes())
        .merge(preference_routes())
        .merge(admin_routes())
        .route("/health", get(handlers::health::health));

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(handlers::ws::ws_handler))
        .with_state(state)
}

/// Inbox endpoints for the authenticated user
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(handlers::notification::list_notifications),
        )
        .route(
            "/notifications/unread-count",
            get(handlers::notification::unread_count),
        )
        .route(
            "/notifications/read-all",
            put(handlers::notification::mark_all_read),
        )
        .route(
            "/notifications/{id}/read",
            put(handlers::notification::mark_read),
        )
        .route(
            "/notifications/{id}",
            delete(handlers::notification::hide),
        )
}

/// Per-type delivery preferences
fn preference_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications/preferences",
            get(handlers::preference::get_preferences).put(handlers::preference::update_preferences),
        )
        .route(
            "/notifications/preferences/defaults",
            get(handlers::preference::default_thresholds),
        )
}

/// Admin-only operations (authorization enforced by the service)
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/admin/notifications/broadcast",
            post(handlers::admin::broadcast),
        )
        .route("/admin/notifications/test", post(handlers::admin::send_test))
        .route(
            "/admin/notifications/statistics",
            get(handlers::admin::statistics),
        )
}
