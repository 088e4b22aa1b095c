//! API integration tests.
//!
//! These drive the full router against the in-memory demo graph.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use subcast_api::{AppState, router as api_router};
use subcast_common::FeedConfig;
use subcast_core::{
    ConversationDataGateway, InMemoryGraph, REDACTED_TEXT, SimulatedPayments, UnlockFee,
    UnlockService,
};
use tower::ServiceExt;

fn create_test_router(payments: Arc<SimulatedPayments>) -> Router {
    let graph = Arc::new(InMemoryGraph::demo());
    let gateway = ConversationDataGateway::new(graph.clone(), &FeedConfig::default());
    let unlock_service = UnlockService::new(payments, graph, UnlockFee::default());

    Router::new()
        .nest("/api", api_router())
        .with_state(AppState::new(gateway, unlock_service))
}

fn app() -> Router {
    create_test_router(Arc::new(SimulatedPayments::approving()))
}

async fn post(app: Router, uri: &str, body: Value, session: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .uri(uri)
        .method("POST")
        .header("Content-Type", "application/json");
    if let Some(session) = session {
        builder = builder.header("X-Session-Id", session);
    }

    let response = app
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_users_show_by_handle_and_fid() {
    let (status, body) = post(app(), "/api/users/show", json!({ "username": "@dwr" }), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fid"], 2);
    assert_eq!(body["data"]["displayName"], "Dan Romero");

    let (status, body) = post(app(), "/api/users/show", json!({ "fid": 1 }), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "vitalik");
}

#[tokio::test]
async fn test_users_show_unknown_returns_null() {
    let (status, body) = post(app(), "/api/users/show", json!({ "username": "nobody" }), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_users_show_without_key_returns_error() {
    let (status, body) = post(app(), "/api/users/show", json!({}), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_users_lookup() {
    let (status, body) = post(app(), "/api/users/lookup", json!({ "fids": [3, 1, 99] }), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let too_many: Vec<u64> = (1..=101).collect();
    let (status, body) = post(app(), "/api/users/lookup", json!({ "fids": too_many }), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_conversation_show() {
    let (status, body) = post(
        app(),
        "/api/conversations/show",
        json!({ "fidA": 1, "fidB": 2 }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let subcasts = body["data"]["subcasts"].as_array().unwrap();
    assert_eq!(body["data"]["count"], 3);
    assert_eq!(subcasts.len(), 3);
    assert_eq!(subcasts[0]["castHash"], "0x123");
    assert!(subcasts.iter().all(|s| s["isReciprocal"] == true));

    let deleted = subcasts.iter().find(|s| s["castHash"] == "0x456").unwrap();
    assert_eq!(deleted["deleted"], true);
    assert_eq!(deleted["text"], REDACTED_TEXT);
    assert_eq!(deleted["author"]["username"], "dwr");
    assert_eq!(deleted["mentioned"][0]["username"], "vitalik");

    assert_eq!(subcasts[0]["author"]["username"], "vitalik");
    assert_eq!(subcasts[0]["author"]["displayName"], "Vitalik Buterin");
}

#[tokio::test]
async fn test_conversation_show_oldest_first() {
    let (_, body) = post(
        app(),
        "/api/conversations/show",
        json!({ "fidA": 2, "fidB": 1, "sort": "oldest" }),
        None,
    )
    .await;

    let hashes: Vec<&str> = body["data"]["subcasts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["castHash"].as_str().unwrap())
        .collect();
    assert_eq!(hashes, ["0x789", "0x456", "0x123"]);
}

#[tokio::test]
async fn test_conversation_with_self_is_rejected() {
    let (status, _) = post(
        app(),
        "/api/conversations/show",
        json!({ "fidA": 1, "fidB": 1 }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_trending() {
    let (status, body) = post(app(), "/api/trending", json!({}), None).await;
    assert_eq!(status, StatusCode::OK);

    let pairs = body["data"].as_array().unwrap();
    assert_eq!(pairs.len(), 3);
    assert_eq!(pairs[0]["subcastCount"], 3);
    assert_eq!(pairs[0]["users"][0]["username"], "vitalik");
    assert_eq!(pairs[0]["users"][1]["username"], "dwr");
    assert_eq!(pairs[1]["subcastCount"], 2);
    assert_eq!(pairs[2]["isReciprocal"], false);

    let (_, body) = post(app(), "/api/trending", json!({ "limit": 1 }), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unlock_fee_is_disclosed() {
    let (status, body) = post(app(), "/api/subcasts/unlock-fee", json!({}), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["amountCents"], 1);
    assert_eq!(body["data"]["currency"], "USD");
}

#[tokio::test]
async fn test_unlock_twice_charges_once() {
    let payments = Arc::new(SimulatedPayments::approving());
    let app = create_test_router(payments.clone());
    let request = json!({ "castHash": "0x456" });

    let (status, first) = post(app.clone(), "/api/subcasts/unlock", request.clone(), Some("s1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["alreadyUnlocked"], false);

    let (status, second) = post(app, "/api/subcasts/unlock", request, Some("s1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"]["alreadyUnlocked"], true);
    assert_eq!(first["data"]["text"], second["data"]["text"]);
    assert_eq!(first["data"]["chargeId"], second["data"]["chargeId"]);
    assert_ne!(first["data"]["text"], REDACTED_TEXT);

    assert_eq!(payments.charge_count(), 1);
}

#[tokio::test]
async fn test_unlock_without_session_is_rejected() {
    let (status, body) = post(
        app(),
        "/api/subcasts/unlock",
        json!({ "castHash": "0x456" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_unlock_live_cast_conflicts() {
    let (status, body) = post(
        app(),
        "/api/subcasts/unlock",
        json!({ "castHash": "0x123" }),
        Some("s1"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_declined_unlock_requires_payment() {
    let app = create_test_router(Arc::new(SimulatedPayments::declining()));
    let (status, body) = post(
        app,
        "/api/subcasts/unlock",
        json!({ "castHash": "0x456" }),
        Some("s1"),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"]["code"], "PAYMENT_REQUIRED");
}

#[tokio::test]
async fn test_end_session_forgets_unlocks() {
    let payments = Arc::new(SimulatedPayments::approving());
    let app = create_test_router(payments.clone());
    let request = json!({ "castHash": "0x456" });

    let (status, _) = post(app.clone(), "/api/subcasts/unlock", request.clone(), Some("s1")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(app.clone(), "/api/subcasts/end-session", json!({}), Some("s1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cleared"], 1);

    let (status, body) = post(app.clone(), "/api/subcasts/unlock", request, Some("s1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["alreadyUnlocked"], false);
    assert_eq!(payments.charge_count(), 2);

    let (status, _) = post(app, "/api/subcasts/end-session", json!({}), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let (status, _) = post(app(), "/api/nonexistent", json!({}), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
