//! Integration tests for scenario listing.

mod common;

use axum::http::StatusCode;

#[tokio::test]
async fn test_list_scenarios_hides_character_attributes() {
    // Arrange
    let app = common::build_test_app("ok");

    // Act
    let (status, json) = common::get_json(&app, "/api/v1/scenarios").await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    let scenarios = json.as_array().unwrap();
    assert_eq!(scenarios.len(), 1);
    let tide_pool = &scenarios[0];
    assert_eq!(tide_pool["id"], "tide-pool");
    assert_eq!(tide_pool["max_turns"], 5);
    assert_eq!(tide_pool["fingerprint"].as_str().unwrap().len(), 64);
    assert_eq!(tide_pool["characters"][0]["id"], "blob");
    assert_eq!(tide_pool["characters"][1]["display_name"], "Crab");
    assert!(!json.to_string().contains("phototroph"));
}
