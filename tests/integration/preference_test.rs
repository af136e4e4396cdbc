//! Integration tests for preference endpoints.

mod helpers;

use http::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use bizhub_entity::user::UserRole;
use bizhub_service::notification::StockChangeEvent;

fn find<'a>(prefs: &'a Value, kind: &str) -> &'a Value {
    prefs
        .as_array()
        .expect("preference array")
        .iter()
        .find(|p| p["type"] == kind)
        .unwrap_or_else(|| panic!("no preference for {kind}"))
}

#[tokio::test]
async fn test_defaults_materialized_for_every_type() {
    let app = helpers::TestApp::new();
    let user = app.create_test_user("sam", UserRole::Staff);
    let token = app.token_for(&user);

    let response = app
        .request("GET", "/api/notifications/preferences", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let prefs = response.data();
    assert_eq!(prefs.as_array().map(Vec::len), Some(12));

    let low = find(prefs, "stock_low");
    assert_eq!(low["in_app_enabled"], Value::Bool(true));
    assert_eq!(low["language"], "en");
}

#[tokio::test]
async fn test_defaults_table() {
    let app = helpers::TestApp::new();
    let user = app.create_test_user("sam", UserRole::Staff);
    let token = app.token_for(&user);

    let response = app
        .request(
            "GET",
            "/api/notifications/preferences/defaults",
            None,
            Some(&token),
        )
        .await;
    let table = response.data();
    assert_eq!(find(table, "order_high_value")["threshold"]["amount"], 1000.0);
    assert_eq!(find(table, "stock_low")["threshold"]["quantity"], 5);
    assert_eq!(find(table, "stock_medium")["threshold"]["quantity"], 10);
}

#[tokio::test]
async fn test_partial_update_and_threshold_reset() {
    let app = helpers::TestApp::new();
    let user = app.create_test_user("sam", UserRole::Staff);
    let token = app.token_for(&user);

    let response = app
        .request(
            "PUT",
            "/api/notifications/preferences",
            Some(json!({
                "preferences": [
                    { "type": "stock_low", "threshold": { "quantity": 3 }, "language": "ar" },
                    { "type": "order_created", "email_enabled": true }
                ]
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request("GET", "/api/notifications/preferences", None, Some(&token))
        .await;
    let prefs = response.data();
    let low = find(prefs, "stock_low");
    assert_eq!(low["threshold"]["quantity"], 3);
    assert_eq!(low["language"], "ar");
    assert_eq!(low["in_app_enabled"], Value::Bool(true));
    let created = find(prefs, "order_created");
    assert_eq!(created["email_enabled"], Value::Bool(true));
    assert_eq!(created["in_app_enabled"], Value::Bool(true));

    // An explicit null clears the stored threshold.
    app.request(
        "PUT",
        "/api/notifications/preferences",
        Some(json!({ "preferences": [ { "type": "stock_low", "threshold": null } ] })),
        Some(&token),
    )
    .await;
    let response = app
        .request("GET", "/api/notifications/preferences", None, Some(&token))
        .await;
    let low = find(response.data(), "stock_low");
    assert_eq!(low["threshold"], Value::Null);
    assert_eq!(low["language"], "ar");
}

#[tokio::test]
async fn test_invalid_updates_rejected_atomically() {
    let app = helpers::TestApp::new();
    let user = app.create_test_user("sam", UserRole::Staff);
    let token = app.token_for(&user);

    let bad_batches = [
        json!({ "preferences": [] }),
        json!({ "preferences": [ { "type": "stock_low", "threshold": { "amount": 5.0 } } ] }),
        json!({ "preferences": [ { "type": "order_created", "threshold": { "amount": 5.0 } } ] }),
        json!({ "preferences": [ { "type": "stock_low", "threshold": { "quantity": -1 } } ] }),
        json!({ "preferences": [ { "type": "stock_low", "language": "fr" } ] }),
        json!({ "preferences": [
            { "type": "order_created", "in_app_enabled": false },
            { "type": "stock_low", "language": "fr" }
        ] }),
    ];

    for batch in bad_batches {
        let response = app
            .request(
                "PUT",
                "/api/notifications/preferences",
                Some(batch.clone()),
                Some(&token),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "batch {batch}");
    }

    // Nothing from the mixed batch was applied.
    let response = app
        .request("GET", "/api/notifications/preferences", None, Some(&token))
        .await;
    assert_eq!(
        find(response.data(), "order_created")["in_app_enabled"],
        Value::Bool(true)
    );
}

#[tokio::test]
async fn test_disabled_in_app_suppresses_only_that_user() {
    let app = helpers::TestApp::new();
    let quiet = app.create_test_user("quiet", UserRole::Staff);
    let loud = app.create_test_user("loud", UserRole::Staff);
    let quiet_token = app.token_for(&quiet);
    let loud_token = app.token_for(&loud);

    app.request(
        "PUT",
        "/api/notifications/preferences",
        Some(json!({ "preferences": [ { "type": "stock_out", "in_app_enabled": false } ] })),
        Some(&quiet_token),
    )
    .await;

    app.state
        .notifications
        .triggers
        .stock_changed(
            &StockChangeEvent {
                product_id: Uuid::new_v4(),
                product_name: "Widget".to_string(),
                sku: None,
                previous_quantity: 3,
                new_quantity: 0,
            },
            None,
        )
        .await;

    let response = app
        .request("GET", "/api/notifications/unread-count", None, Some(&quiet_token))
        .await;
    assert_eq!(response.data()["count"], 0);
    let response = app
        .request("GET", "/api/notifications/unread-count", None, Some(&loud_token))
        .await;
    assert_eq!(response.data()["count"], 1);
}
