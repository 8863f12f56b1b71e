//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bingo_generation::application::command_handlers::ExecutionMode;
use bingo_generation::domain::qr::QrSigner;
use bingo_test_support::fixed_clock;
use http_body_util::BodyExt;
use tower::ServiceExt;

use bingo_api::state::AppState;

/// API key accepted by the test app.
pub const API_KEY: &str = "integration-key";

/// Build the full app router with a fresh index and a fixed clock. Uses the
/// same route structure as `main.rs`.
pub fn build_test_app() -> Router {
    bingo_api::app(build_test_state())
}

/// State shared between several `oneshot` calls against the same index.
pub fn build_test_state() -> AppState {
    AppState::new(
        Arc::new(fixed_clock()),
        QrSigner::new("integration-secret"),
        ExecutionMode::Parallel,
        API_KEY,
    )
}

/// Send a POST request with a JSON body and the test API key.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a GET request with the test API key.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
