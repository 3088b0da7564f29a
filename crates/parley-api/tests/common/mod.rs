//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use parley_core::repository::SessionRepository;
use parley_session::application::generator::CharacterGenerator;
use parley_session::application::lifecycle::{ManagerSettings, SessionManager};
use parley_test_support::fixtures::{sample_registry, start_time};
use parley_test_support::{FixedClock, InMemorySessionRepository, MockRng, ScriptedGenerator};
use tower::ServiceExt;

use parley_api::build_router;
use parley_api::state::AppState;

/// Build the full app router over the sample scenario with a fixed clock
/// and a generator that always answers `reply`.
pub fn build_test_app(reply: &str) -> Router {
    build_test_app_with(
        Arc::new(ScriptedGenerator::replying(reply)),
        Arc::new(InMemorySessionRepository::new()),
    )
}

/// Build the full app router with the given collaborators.
pub fn build_test_app_with(
    generator: Arc<dyn CharacterGenerator>,
    repository: Arc<dyn SessionRepository>,
) -> Router {
    let manager = SessionManager::new(
        sample_registry(),
        repository,
        generator,
        Arc::new(FixedClock(start_time())),
        Box::new(MockRng),
        ManagerSettings::default(),
    );
    build_router(AppState::new(Arc::new(manager)))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: &Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// Send a POST request without a body and return the response.
pub async fn post_empty(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Start a blob session and return its id as a string.
pub async fn start_blob(app: &Router) -> String {
    let (status, json) = post_json(
        app,
        "/api/v1/sessions",
        &serde_json::json!({ "scenario_id": "tide-pool", "character_id": "blob" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["session_id"].as_str().unwrap().to_owned()
}
