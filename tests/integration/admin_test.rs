//! Integration tests for admin notification endpoints.

mod helpers;

use http::StatusCode;
use serde_json::{Value, json};

use bizhub_entity::user::UserRole;

#[tokio::test]
async fn test_broadcast_requires_admin() {
    let app = helpers::TestApp::new();
    let staff = app.create_test_user("sam", UserRole::Staff);
    let token = app.token_for(&staff);

    let response = app
        .request(
            "POST",
            "/api/admin/notifications/broadcast",
            Some(json!({ "title": "Hi", "message": "Everyone" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    // Malformed bodies do not reveal validation details to non-admins.
    for body in [
        json!({ "title": "", "message": "" }),
        json!({ "title": 5 }),
        json!({ "type": "order_created", "title": "x", "message": "y" }),
    ] {
        let response = app
            .request(
                "POST",
                "/api/admin/notifications/broadcast",
                Some(body.clone()),
                Some(&token),
            )
            .await;
        assert_eq!(response.status, StatusCode::FORBIDDEN, "body {body}");
    }

    let response = app
        .request("GET", "/api/notifications/unread-count", None, Some(&token))
        .await;
    assert_eq!(response.data()["count"], 0);
}

#[tokio::test]
async fn test_broadcast_to_all_and_to_explicit_users() {
    let app = helpers::TestApp::new();
    let admin = app.create_test_user("root", UserRole::Admin);
    let staff = app.create_test_user("sam", UserRole::Staff);
    let viewer = app.create_test_user("victor", UserRole::Viewer);
    let admin_token = app.token_for(&admin);

    let response = app
        .request(
            "POST",
            "/api/admin/notifications/broadcast",
            Some(json!({
                "type": "maintenance",
                "title": "Downtime",
                "title_localized": { "ar": "صيانة" },
                "message": "Back at 23:00",
                "priority": "high"
            })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let data = response.data();
    assert_eq!(data["delivered"], 3);
    assert_eq!(data["notification"]["type"], "maintenance");
    assert_eq!(data["notification"]["is_broadcast"], Value::Bool(true));

    // Explicit recipients receive it and nobody else does.
    let response = app
        .request(
            "POST",
            "/api/admin/notifications/broadcast",
            Some(json!({
                "title": "Just you",
                "message": "Private",
                "user_ids": [viewer.id]
            })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.data()["delivered"], 1);

    let viewer_token = app.token_for(&viewer);
    let response = app
        .request("GET", "/api/notifications/unread-count", None, Some(&viewer_token))
        .await;
    assert_eq!(response.data()["count"], 2);

    let staff_token = app.token_for(&staff);
    let response = app
        .request("GET", "/api/notifications/unread-count", None, Some(&staff_token))
        .await;
    assert_eq!(response.data()["count"], 1);
}

#[tokio::test]
async fn test_broadcast_validation() {
    let app = helpers::TestApp::new();
    let admin = app.create_test_user("root", UserRole::Admin);
    let token = app.token_for(&admin);

    for body in [
        json!({ "title": "", "message": "x" }),
        json!({ "title": "x", "message": "" }),
        json!({ "type": "order_created", "title": "x", "message": "y" }),
        json!({ "title": "x", "message": "y", "expires_at": "2000-01-01T00:00:00Z" }),
        json!({ "title": 5, "message": "y" }),
    ] {
        let response = app
            .request(
                "POST",
                "/api/admin/notifications/broadcast",
                Some(body.clone()),
                Some(&token),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "body {body}");
    }
}

#[tokio::test]
async fn test_send_test_and_statistics() {
    let app = helpers::TestApp::new();
    let admin = app.create_test_user("root", UserRole::Admin);
    app.create_test_user("sam", UserRole::Staff);
    let token = app.token_for(&admin);

    let response = app
        .request("POST", "/api/admin/notifications/test", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["notification"]["type"], "test");
    assert_eq!(response.data()["delivered"], 1);

    app.request(
        "POST",
        "/api/admin/notifications/broadcast",
        Some(json!({ "title": "Hello", "message": "All" })),
        Some(&token),
    )
    .await;
    app.request("PUT", "/api/notifications/read-all", None, Some(&token))
        .await;

    let response = app
        .request(
            "GET",
            "/api/admin/notifications/statistics",
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let stats = response.data();
    assert_eq!(stats["total_notifications"], 2);
    assert_eq!(stats["total_deliveries"], 3);
    assert_eq!(stats["read_deliveries"], 2);

    let response = app
        .request(
            "GET",
            "/api/admin/notifications/statistics?from=2030-01-02T00:00:00Z&to=2030-01-01T00:00:00Z",
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
