//! # bizhub-api
//!
//! HTTP API layer for BizHub notifications built on Axum.
//!
//! Provides the notification, preference and admin REST endpoints, the
//! WebSocket upgrade, extractors, DTOs and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, build_state, run_server};
pub use error::ApiError;
pub use state::AppState;
