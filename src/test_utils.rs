//! Shared helpers for handler tests.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use serde_json::Value as JsonValue;
use tower::ServiceExt;

use crate::app;
use crate::models::{ResponseEnvelope, TodoItem};
use crate::service::TodoService;
use crate::state::AppState;
use crate::store::InMemoryTodoStore;

/// Full application router over a fresh in-memory store.
pub fn setup_test_app() -> (Router, Arc<InMemoryTodoStore>) {
    let store = Arc::new(InMemoryTodoStore::new());
    let state = AppState {
        todos: TodoService::new(store.clone(), "TODO"),
    };
    (app::router(state), store)
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<JsonValue>) -> Response<Body> {
    match body {
        Some(json) => send_raw(app, method, uri, serde_json::to_string(&json).unwrap()).await,
        None => {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            app.clone().oneshot(request).await.unwrap()
        }
    }
}

/// Send a request with a raw JSON-typed body, valid or not.
pub async fn send_raw(app: &Router, method: &str, uri: &str, body: impl Into<Body>) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn read_envelope(response: Response<Body>) -> (StatusCode, ResponseEnvelope) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

/// Create a todo through the API and return the stored item.
pub async fn create_todo(app: &Router, description: &str) -> TodoItem {
    let response = send(
        app,
        "POST",
        "/todo",
        Some(serde_json::json!({ "taskDescription": description })),
    )
    .await;
    let (status, envelope) = read_envelope(response).await;
    assert_eq!(status, StatusCode::OK);
    envelope.into_item().unwrap()
}
