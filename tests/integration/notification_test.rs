//! Integration tests for the inbox endpoints.

mod helpers;

use http::StatusCode;
use serde_json::Value;
use uuid::Uuid;

use bizhub_entity::user::UserRole;
use bizhub_service::notification::{OrderEvent, StockChangeEvent};

fn order(total: f64) -> OrderEvent {
    OrderEvent {
        order_id: Uuid::new_v4(),
        order_number: "SO-1001".to_string(),
        customer_name: Some("Acme".to_string()),
        total_amount: total,
        currency: "USD".to_string(),
        status: "pending".to_string(),
    }
}

fn types_of(page: &Value) -> Vec<String> {
    page["items"]
        .as_array()
        .expect("items array")
        .iter()
        .map(|item| item["type"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn test_requires_bearer_token() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/api/notifications", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["success"], Value::Bool(false));

    let response = app
        .request("GET", "/api/notifications", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_high_value_order_reaches_operations_staff_only() {
    let app = helpers::TestApp::new();
    let staff = app.create_test_user("sam", UserRole::Staff);
    let viewer = app.create_test_user("victor", UserRole::Viewer);

    app.state
        .notifications
        .triggers
        .order_created(&order(1500.0), None)
        .await;

    let token = app.token_for(&staff);
    let response = app
        .request("GET", "/api/notifications", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let mut types = types_of(response.data());
    types.sort();
    assert_eq!(types, vec!["order_created", "order_high_value"]);

    let response = app
        .request("GET", "/api/notifications/unread-count", None, Some(&token))
        .await;
    assert_eq!(response.data()["count"], 2);

    let viewer_token = app.token_for(&viewer);
    let response = app
        .request("GET", "/api/notifications/unread-count", None, Some(&viewer_token))
        .await;
    assert_eq!(response.data()["count"], 0);
}

#[tokio::test]
async fn test_order_below_threshold_is_not_high_value() {
    let app = helpers::TestApp::new();
    let staff = app.create_test_user("sam", UserRole::Staff);
    let token = app.token_for(&staff);

    let response = app
        .request(
            "PUT",
            "/api/notifications/preferences",
            Some(serde_json::json!({
                "preferences": [{ "type": "order_high_value", "threshold": { "amount": 2000 } }]
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    app.state
        .notifications
        .triggers
        .order_created(&order(1500.0), None)
        .await;

    let response = app
        .request("GET", "/api/notifications", None, Some(&token))
        .await;
    assert_eq!(types_of(response.data()), vec!["order_created"]);
}

#[tokio::test]
async fn test_stock_drop_sends_exactly_one_level() {
    let app = helpers::TestApp::new();
    let staff = app.create_test_user("sam", UserRole::Staff);
    let token = app.token_for(&staff);

    app.state
        .notifications
        .triggers
        .stock_changed(
            &StockChangeEvent {
                product_id: Uuid::new_v4(),
                product_name: "Widget".to_string(),
                sku: Some("W-1".to_string()),
                previous_quantity: 12,
                new_quantity: 4,
            },
            None,
        )
        .await;

    let response = app
        .request("GET", "/api/notifications", None, Some(&token))
        .await;
    assert_eq!(types_of(response.data()), vec!["stock_low"]);
}

#[tokio::test]
async fn test_read_flow() {
    let app = helpers::TestApp::new();
    let staff = app.create_test_user("sam", UserRole::Staff);
    let other = app.create_test_user("olga", UserRole::Staff);
    let token = app.token_for(&staff);

    app.state
        .notifications
        .triggers
        .order_created(&order(1500.0), None)
        .await;

    let response = app
        .request("GET", "/api/notifications?unread_only=true", None, Some(&token))
        .await;
    let first = response.data()["items"][0]["id"]
        .as_str()
        .expect("notification id")
        .to_string();

    let path = format!("/api/notifications/{first}/read");
    let response = app.request("PUT", &path, None, Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["changed"], Value::Bool(true));
    assert_eq!(response.data()["unread_count"], 1);

    // Repeating is a no-op.
    let response = app.request("PUT", &path, None, Some(&token)).await;
    assert_eq!(response.data()["changed"], Value::Bool(false));
    assert_eq!(response.data()["unread_count"], 1);

    let response = app
        .request("PUT", "/api/notifications/read-all", None, Some(&token))
        .await;
    assert_eq!(response.data()["updated"], 1);
    assert_eq!(response.data()["unread_count"], 0);

    // The other recipient is untouched.
    let other_token = app.token_for(&other);
    let response = app
        .request("GET", "/api/notifications/unread-count", None, Some(&other_token))
        .await;
    assert_eq!(response.data()["count"], 2);
}

#[tokio::test]
async fn test_hide_and_unknown_ids() {
    let app = helpers::TestApp::new();
    let staff = app.create_test_user("sam", UserRole::Staff);
    let token = app.token_for(&staff);

    app.state
        .notifications
        .triggers
        .order_created(&order(100.0), None)
        .await;

    let response = app
        .request("GET", "/api/notifications", None, Some(&token))
        .await;
    let id = response.data()["items"][0]["id"]
        .as_str()
        .expect("notification id")
        .to_string();

    let response = app
        .request("DELETE", &format!("/api/notifications/{id}"), None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request("GET", "/api/notifications", None, Some(&token))
        .await;
    assert_eq!(response.data()["total_items"], 0);

    let response = app
        .request(
            "PUT",
            &format!("/api/notifications/{}/read", Uuid::new_v4()),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .request("PUT", "/api/notifications/garbage/read", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pagination() {
    let app = helpers::TestApp::new();
    let staff = app.create_test_user("sam", UserRole::Staff);
    let token = app.token_for(&staff);

    for total in [10.0, 20.0, 30.0] {
        app.state
            .notifications
            .triggers
            .order_created(&order(total), None)
            .await;
    }

    let response = app
        .request("GET", "/api/notifications?page=2&per_page=2", None, Some(&token))
        .await;
    let data = response.data();
    assert_eq!(data["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(data["total_items"], 3);
    assert_eq!(data["page"], 2);
    assert_eq!(data["has_next"], Value::Bool(false));
}

#[tokio::test]
async fn test_deactivated_user_receives_nothing() {
    let app = helpers::TestApp::new();
    let staff = app.create_test_user("sam", UserRole::Staff);
    let former = app.create_test_user("olga", UserRole::Staff);
    assert!(app.users.set_active(former.id, false));

    app.state
        .notifications
        .triggers
        .order_created(&order(1500.0), None)
        .await;

    let token = app.token_for(&staff);
    let response = app
        .request("GET", "/api/notifications/unread-count", None, Some(&token))
        .await;
    assert_eq!(response.data()["count"], 2);

    let former_token = app.token_for(&former);
    let response = app
        .request("GET", "/api/notifications/unread-count", None, Some(&former_token))
        .await;
    assert_eq!(response.data()["count"], 0);
}
