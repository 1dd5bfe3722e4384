//! HTTP route tests against a recording gateway.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use relay_api::{create_router, ApiConfig, AppState};
use relay_core::RelayConfig;
use relay_models::{ChatId, CustomerId, OperatorId};
use relay_telegram::RecordingGateway;
use serde_json::{json, Value};

const OPERATOR: i64 = 500;

fn setup() -> (TestServer, Arc<RecordingGateway>, AppState) {
    let gateway = Arc::new(RecordingGateway::new());
    let relay = RelayConfig::new("token")
        .with_bot_username("@ShopBot")
        .with_operators(vec![OperatorId(OPERATOR)]);
    let state = AppState::build(ApiConfig::default(), &relay, "ShopBot", gateway.clone()).unwrap();
    let server = TestServer::new(create_router(state.clone())).unwrap();
    (server, gateway, state)
}

fn webhook_message(update_id: i64, from: i64, text: &str) -> Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "date": 0,
            "from": {"id": from, "is_bot": false, "first_name": "User"},
            "chat": {"id": from, "type": "private"},
            "text": text
        }
    })
}

#[tokio::test]
async fn test_send_order_returns_link_and_notifies() {
    let (server, gateway, _state) = setup();

    let response = server
        .post("/api/telegram/send-order")
        .json(&json!({
            "items": [
                {"name": "A", "size": "M", "quantity": 2, "price": 100},
                {"name": "B", "size": "L", "quantity": 1, "price": 50}
            ],
            "customer": {"firstName": "Aida", "phone": "+7 700", "city": "Almaty"},
            "deliveryPrice": 1200
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    let order_id = body["orderId"].as_str().unwrap();
    assert!(!order_id.is_empty());
    assert_eq!(
        body["botLink"],
        format!("https://t.me/ShopBot?start=order_{}", order_id)
    );

    let sent = gateway.messages_to(ChatId(OPERATOR));
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("<b>Total: 1450</b>"));
    assert!(sent[0].text.contains(order_id));
}

#[tokio::test]
async fn test_send_order_legacy_shape_uses_city_delivery() {
    let (server, gateway, _state) = setup();

    let response = server
        .post("/api/telegram/send-order")
        .json(&json!({
            "order": {
                "items": [{"product": {"name": "Cap", "price": 5000}, "size": "One", "quantity": 1}],
                "customer": {"firstName": "Dana", "city": "Караганда"},
                "timestamp": "2024-05-01T10:00:00Z"
            }
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let text = &gateway.messages_to(ChatId(OPERATOR))[0].text;
    assert!(text.contains("Delivery: 1200"));
    assert!(text.contains("<b>Total: 6200</b>"));
}

#[tokio::test]
async fn test_malformed_order_is_rejected_and_reported() {
    let (server, gateway, _state) = setup();

    let response = server
        .post("/api/telegram/send-order")
        .json(&json!({"customer": {"firstName": "Aida"}}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("no items"));

    let sent = gateway.messages_to(ChatId(OPERATOR));
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("Order submission failed"));
}

#[tokio::test]
async fn test_invalid_json_order() {
    let (server, _gateway, _state) = setup();
    let response = server
        .post("/api/telegram/send-order")
        .text("{not json")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_always_acknowledges() {
    let (server, gateway, _state) = setup();

    let response = server.post("/api/telegram/webhook").text("garbage").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["ok"], true);

    let response = server
        .post("/api/telegram/webhook")
        .json(&json!({"update_id": 1, "edited_message": {}}))
        .await;
    response.assert_status_ok();
    assert!(gateway.messages().is_empty());
}

#[tokio::test]
async fn test_webhook_relay_flow() {
    let (server, gateway, state) = setup();

    server
        .post("/api/telegram/webhook")
        .json(&webhook_message(1, 42, "/start order_777"))
        .await
        .assert_status_ok();

    server
        .post("/api/telegram/webhook")
        .json(&json!({
            "update_id": 2,
            "callback_query": {
                "id": "cb-1",
                "from": {"id": OPERATOR, "is_bot": false, "first_name": "Op"},
                "chat_instance": "1",
                "data": "connect:42"
            }
        }))
        .await
        .assert_status_ok();

    let sessions = state.dispatcher.sessions().await.unwrap();
    let session = sessions
        .iter()
        .find(|s| s.customer_id == CustomerId(42))
        .unwrap();
    assert_eq!(session.bound_operator(), Some(OperatorId(OPERATOR)));

    gateway.clear();
    server
        .post("/api/telegram/webhook")
        .json(&webhook_message(3, OPERATOR, "Your order ships today"))
        .await
        .assert_status_ok();
    assert_eq!(
        gateway.messages_to(ChatId(42))[0].text,
        "Your order ships today"
    );

    let health: Value = server.get("/api/health").await.json();
    assert_eq!(health["sessions"], 1);
}
