//! Integration tests for the HTTP surface.
//!
//! Drives the complete router (auth middleware, CORS, tracing, timeout)
//! with `tower::ServiceExt::oneshot` against the in-memory store.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use parley::adapters::http::middleware::AuthState;
use parley::adapters::http::{app_router, MessagingAppState};
use parley::adapters::{DirectorySessionValidator, InMemoryEventBus, InMemoryMessageStore};
use parley::config::ServerConfig;

// =============================================================================
// Test Infrastructure
// =============================================================================

async fn setup() -> (Router, InMemoryMessageStore) {
    let store = InMemoryMessageStore::new();
    store.add_user("alice@example.com").await.unwrap();
    store.add_user("bob@example.com").await.unwrap();

    let state = MessagingAppState::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(InMemoryEventBus::new()),
        32,
    );
    let validator: AuthState = Arc::new(DirectorySessionValidator::new(Arc::new(store.clone())));
    (
        app_router(state, validator, &ServerConfig::default()),
        store,
    )
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn send_as(email: &str, recipient: &str, content: &str) -> Request<Body> {
    Request::post("/api/messages")
        .header(header::AUTHORIZATION, format!("Bearer {}", email))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "recipient": recipient, "content": content }).to_string(),
        ))
        .unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn conversation_round_trip_over_http() {
    let (app, _) = setup().await;

    let (status, sent) = call(&app, send_as("alice@example.com", "bob@example.com", "hi bob")).await;
    assert_eq!(status, StatusCode::CREATED);

    // Bob authenticates with the session cookie instead of a bearer token.
    let (status, list) = call(
        &app,
        Request::get("/api/conversations")
            .header(header::COOKIE, "theme=dark; session=bob@example.com")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["conversations"][0]["unreadCount"], 1);
    assert_eq!(list["conversations"][0]["partnerEmail"], "alice@example.com");

    let (status, page) = call(
        &app,
        Request::get("/api/conversations/alice@example.com/messages")
            .header(header::AUTHORIZATION, "Bearer bob@example.com")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["messages"][0]["id"], sent["id"]);
    assert_eq!(page["prevCursor"], sent["createdAt"]);

    let read_uri = format!("/api/messages/{}/read", sent["id"].as_str().unwrap());
    let mark = || {
        Request::post(read_uri.as_str())
            .header(header::AUTHORIZATION, "Bearer bob@example.com")
            .body(Body::empty())
            .unwrap()
    };
    let (status, first) = call(&app, mark()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = call(&app, mark()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!first["readAt"].is_null());
    assert_eq!(first["readAt"], second["readAt"]);

    let (_, list) = call(
        &app,
        Request::get("/api/conversations")
            .header(header::AUTHORIZATION, "Bearer bob@example.com")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(list["conversations"][0]["unreadCount"], 0);
}

#[tokio::test]
async fn take_is_clamped_and_garbage_is_rejected() {
    let (app, _) = setup().await;
    for n in 0..3 {
        call(&app, send_as("alice@example.com", "bob@example.com", &format!("m{}", n))).await;
    }

    let get = |uri: &str| {
        Request::get(uri)
            .header(header::AUTHORIZATION, "Bearer alice@example.com")
            .body(Body::empty())
            .unwrap()
    };

    let (status, page) = call(&app, get("/api/conversations/bob@example.com/messages?take=0")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["messages"].as_array().unwrap().len(), 1);

    let (status, page) =
        call(&app, get("/api/conversations/bob@example.com/messages?take=500")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["messages"].as_array().unwrap().len(), 3);

    let (status, body) =
        call(&app, get("/api/conversations/bob@example.com/messages?take=lots")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn unknown_partner_is_not_found() {
    let (app, _) = setup().await;
    let (status, body) = call(
        &app,
        Request::get("/api/conversations/carol@example.com/messages")
            .header(header::AUTHORIZATION, "Bearer alice@example.com")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn sending_to_yourself_is_rejected() {
    let (app, store) = setup().await;
    let (status, _) = call(&app, send_as("alice@example.com", "alice@example.com", "me")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(store.message_count().await, 0);
}

#[tokio::test]
async fn store_outage_is_service_unavailable() {
    let (app, store) = setup().await;
    store.set_unavailable(true);

    let (status, body) = call(&app, send_as("alice@example.com", "bob@example.com", "hi")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn live_endpoint_requires_session() {
    let (app, _) = setup().await;
    let (status, body) = call(
        &app,
        Request::get("/api/live").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn health_is_public() {
    let (app, _) = setup().await;
    let (status, body) = call(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
