//! Application builder: wires stores, services, realtime and router into an Axum app.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use bizhub_auth::JwtDecoder;
use bizhub_core::config::AppConfig;
use bizhub_core::error::{AppError, ErrorKind};
use bizhub_database::Stores;
use bizhub_realtime::{ConnectionManager, RealtimeEngine, WsAuthenticator};
use bizhub_service::NotificationServices;

use crate::middleware::cors::build_cors_layer;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);
    build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Wires every service over already-opened stores.
pub fn build_state(config: AppConfig, stores: Stores) -> Result<AppState, AppError> {
    let jwt_decoder = Arc::new(JwtDecoder::new(&config.auth));

    // The connection manager is the realtime channel the services push through.
    let connections = Arc::new(ConnectionManager::new(config.realtime.clone()));
    let notifications = NotificationServices::build(&stores, connections.clone(), &config)?;

    let realtime = RealtimeEngine::new(
        connections,
        WsAuthenticator::new(Arc::clone(&jwt_decoder)),
        notifications.read_state.clone(),
    );

    Ok(AppState {
        config: Arc::new(config),
        stores,
        jwt_decoder,
        realtime,
        notifications: Arc::new(notifications),
    })
}

/// Runs the BizHub server until a shutdown signal arrives.
pub async fn run_server(config: AppConfig) -> Result<(), AppError> {
    info!(
        backend = ?config.database.backend,
        email_transport = ?config.email.transport,
        "Starting BizHub notification server"
    );

    let stores = Stores::connect(&config.database).await?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);

    let state = build_state(config, stores)?;
    let engine = state.realtime.clone();
    let app = build_app(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, format!("Failed to bind {addr}"), e)
        })?;
    info!(addr = %addr, "BizHub server listening");

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        // Upgraded sockets are not tracked by the server; close them here.
        engine.shutdown();
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    if tokio::time::timeout(grace, state.stores.close()).await.is_err() {
        tracing::warn!("Timed out closing the database pool");
    }
    info!("BizHub server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
