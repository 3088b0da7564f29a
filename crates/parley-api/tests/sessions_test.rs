//! Integration tests for the session routes.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use parley_test_support::{FailingGenerator, InMemorySessionRepository};
use uuid::Uuid;

#[tokio::test]
async fn test_start_session_returns_201_with_summary() {
    let app = common::build_test_app("ok");

    let (status, json) = common::post_json(
        &app,
        "/api/v1/sessions",
        &serde_json::json!({ "scenario_id": "tide-pool", "character_id": "crab" }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["character_id"], "crab");
    assert_eq!(json["status"], "active");
    assert_eq!(json["turn_count"], 0);
    assert_eq!(json["turns_remaining"], 5);
}

#[tokio::test]
async fn test_start_session_with_unknown_scenario_returns_422() {
    let app = common::build_test_app("ok");

    let (status, json) = common::post_json(
        &app,
        "/api/v1/sessions",
        &serde_json::json!({ "scenario_id": "deep-sea" }),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "configuration_error");
    assert_eq!(json["retryable"], false);
}

#[tokio::test]
async fn test_full_session_round_trip() {
    // Arrange
    let app = common::build_test_app("It drifts toward the glow.");
    let id = common::start_blob(&app).await;

    // Act: play, guess, end.
    let (status, step) = common::post_json(
        &app,
        &format!("/api/v1/sessions/{id}/actions"),
        &serde_json::json!({ "text": "I wave" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, guess) = common::post_json(
        &app,
        &format!("/api/v1/sessions/{id}/hypotheses"),
        &serde_json::json!({ "text": "it wants to reach the light" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, score) = common::post_empty(&app, &format!("/api/v1/sessions/{id}/end")).await;

    // Assert
    assert_eq!(step["outcome"], "step");
    assert_eq!(step["turn_index"], 0);
    assert_eq!(step["output"], "It drifts toward the glow.");
    assert_eq!(step["attributes"]["mood"], "curious");
    assert!(step["attributes"].get("diet").is_none());
    assert_eq!(guess["declared_at_turn"], 1);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(score["termination"], "forced");
    assert_eq!(score["goals"][0]["goal_id"], "seek_light");
    assert_eq!(score["goals"][0]["matched"], true);

    let (status, again) = common::get_json(&app, &format!("/api/v1/sessions/{id}/score")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again, score);
}

#[tokio::test]
async fn test_slash_commands_through_actions_endpoint() {
    let app = common::build_test_app("ok");
    let id = common::start_blob(&app).await;
    let uri = format!("/api/v1/sessions/{id}/actions");

    let (_, guessed) =
        common::post_json(&app, &uri, &serde_json::json!({ "text": "/guess it likes light" })).await;
    let (_, ended) = common::post_json(&app, &uri, &serde_json::json!({ "text": "/quit" })).await;
    let (status, after) = common::post_json(&app, &uri, &serde_json::json!({ "text": "wave" })).await;

    assert_eq!(guessed["outcome"], "hypothesis_recorded");
    assert_eq!(ended["outcome"], "ended");
    assert_eq!(ended["reason"], "participant_ended");
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(after["error"], "session_terminated");
}

#[tokio::test]
async fn test_empty_action_returns_400() {
    let app = common::build_test_app("ok");
    let id = common::start_blob(&app).await;

    let (status, json) = common::post_json(
        &app,
        &format!("/api/v1/sessions/{id}/actions"),
        &serde_json::json!({ "text": "  " }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_action");
}

#[tokio::test]
async fn test_generator_failure_returns_503_and_is_retryable() {
    // Arrange
    let app = common::build_test_app_with(
        Arc::new(FailingGenerator::unavailable()),
        Arc::new(InMemorySessionRepository::new()),
    );
    let id = common::start_blob(&app).await;

    // Act
    let (status, json) = common::post_json(
        &app,
        &format!("/api/v1/sessions/{id}/actions"),
        &serde_json::json!({ "text": "I wave" }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "turn_failed");
    assert_eq!(json["retryable"], true);
    let (_, summary) = common::get_json(&app, &format!("/api/v1/sessions/{id}")).await;
    assert_eq!(summary["turn_count"], 0);
    assert_eq!(summary["phase"], "awaiting_participant_action");
}

#[tokio::test]
async fn test_suspend_and_resume_round_trip() {
    let app = common::build_test_app("ok");
    let id = common::start_blob(&app).await;

    let (status, suspended) =
        common::post_empty(&app, &format!("/api/v1/sessions/{id}/suspend")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, rejected) = common::post_json(
        &app,
        &format!("/api/v1/sessions/{id}/actions"),
        &serde_json::json!({ "text": "wave" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, resumed) =
        common::post_empty(&app, &format!("/api/v1/sessions/{id}/resume")).await;

    assert_eq!(suspended["status"], "suspended");
    assert_eq!(rejected["error"], "invalid_session_state");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resumed["status"], "active");
}

#[tokio::test]
async fn test_view_reveals_attribute_after_triggering_action() {
    let app = common::build_test_app("ok");
    let id = common::start_blob(&app).await;

    common::post_json(
        &app,
        &format!("/api/v1/sessions/{id}/actions"),
        &serde_json::json!({ "text": "I measure it" }),
    )
    .await;
    let (status, view) = common::get_json(&app, &format!("/api/v1/sessions/{id}/view")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["as_of_turn_count"], 1);
    assert_eq!(view["attributes"]["size"], "small");
    assert!(view["attributes"].get("diet").is_none());
}

#[tokio::test]
async fn test_unknown_session_returns_404() {
    let app = common::build_test_app("ok");

    let (status, json) =
        common::get_json(&app, &format!("/api/v1/sessions/{}", Uuid::new_v4())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "session_not_found");
}

#[tokio::test]
async fn test_score_of_active_session_returns_409() {
    let app = common::build_test_app("ok");
    let id = common::start_blob(&app).await;

    let (status, json) = common::get_json(&app, &format!("/api/v1/sessions/{id}/score")).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "session_not_complete");
}
