//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use chrono::Utc;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use bizhub_api::AppState;
use bizhub_auth::JwtEncoder;
use bizhub_core::config::{AppConfig, DatabaseBackend};
use bizhub_database::Stores;
use bizhub_database::memory::MemoryUserDirectory;
use bizhub_entity::user::{User, UserRole};

/// Test application over the in-memory backend.
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state, for driving services directly
    pub state: AppState,
    /// User directory the stores read from
    pub users: Arc<MemoryUserDirectory>,
    /// Application config
    pub config: AppConfig,
    encoder: JwtEncoder,
}

impl TestApp {
    /// Create a new test application
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create a test application from an adjusted config
    pub fn with_config(mut config: AppConfig) -> Self {
        config.database.backend = DatabaseBackend::Memory;
        config.auth.jwt_secret = "integration-test-secret".to_string();
        config.email.enabled = false;

        let users = Arc::new(MemoryUserDirectory::new());
        let stores = Stores::memory(Arc::clone(&users));
        let state =
            bizhub_api::build_state(config.clone(), stores).expect("Failed to build app state");
        let router = bizhub_api::build_app(state.clone());

        Self {
            router,
            state,
            users,
            encoder: JwtEncoder::new(&config.auth),
            config,
        }
    }

    /// Create an active test user
    pub fn create_test_user(&self, username: &str, role: UserRole) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: Some(format!("{username}@test.com")),
            display_name: Some(username.to_string()),
            role,
            is_active: true,
            created_at: Utc::now(),
        };
        self.users.upsert(user.clone());
        user
    }

    /// Mint an access token for a user
    pub fn token_for(&self, user: &User) -> String {
        self.encoder
            .generate_access_token(user.id, user.role, &user.username)
            .expect("Failed to sign token")
            .0
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Serve the app on an ephemeral port, for WebSocket clients
    pub async fn spawn(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("No local addr");
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server failed");
        });
        addr
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

impl TestResponse {
    /// The `data` member of a success envelope
    pub fn data(&self) -> &Value {
        assert_eq!(
            self.body["success"],
            Value::Bool(true),
            "Not a success envelope: {:?}",
            self.body
        );
        &self.body["data"]
    }
}
