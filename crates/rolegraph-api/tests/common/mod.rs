//! Shared test utilities for rolegraph API tests.

// Each test file compiles this module separately and uses a different subset.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;

use rolegraph_api::http::{create_router, AppState};
use rolegraph_storage::MemoryGraphStore;

/// Number of concurrent clients for concurrency tests.
pub const CONCURRENT_CLIENT_COUNT: usize = 50;

/// Creates a test app over the shared store.
///
/// Each call builds fresh state over the same store; the write gate lives in
/// the state, so tests that race writers share one app instead.
pub fn create_test_app(store: &Arc<MemoryGraphStore>) -> axum::Router {
    create_router(AppState::new(Arc::clone(store)))
}

pub async fn post_json(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, Body::from(serde_json::to_string(&body).unwrap())).await
}

pub async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, Body::empty()).await
}

async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Body,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| {
            serde_json::json!({ "raw_body": String::from_utf8_lossy(&body).to_string() })
        })
    };
    (status, json)
}

/// Runs a natural-language command and returns the outcome body.
pub async fn run_command(app: axum::Router, command: &str) -> serde_json::Value {
    let (status, body) =
        post_json(app, "/api/rbac/nlp", serde_json::json!({ "command": command })).await;
    assert_eq!(status, StatusCode::OK, "command {command:?} answered {status}");
    body
}
