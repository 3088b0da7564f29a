//! Routes for browsing the loaded scenarios.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use parley_scenario::application::registry::RegisteredScenario;
use serde::Serialize;

use crate::state::AppState;

/// A character as offered to participants. Attributes stay hidden.
#[derive(Debug, Serialize)]
pub struct CharacterListing {
    /// Character identifier.
    pub id: String,
    /// Display name.
    pub display_name: String,
    /// One-line description.
    pub short_description: String,
}

/// A loaded scenario.
#[derive(Debug, Serialize)]
pub struct ScenarioListing {
    /// Scenario identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Author-assigned version.
    pub version: String,
    /// Fingerprint sessions are bound to.
    pub fingerprint: String,
    /// Turn limit per session.
    pub max_turns: u64,
    /// Characters a session may be bound to.
    pub characters: Vec<CharacterListing>,
}

impl From<&RegisteredScenario> for ScenarioListing {
    fn from(registered: &RegisteredScenario) -> Self {
        let config = &registered.config;
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            description: config.description.clone(),
            version: config.version.clone(),
            fingerprint: registered.fingerprint.clone(),
            max_turns: config.limits.max_turns,
            characters: config
                .characters
                .iter()
                .map(|c| CharacterListing {
                    id: c.id.clone(),
                    display_name: c.display_name.clone(),
                    short_description: c.profile.short_description.clone(),
                })
                .collect(),
        }
    }
}

/// GET /
async fn list_scenarios(State(state): State<AppState>) -> Json<Vec<ScenarioListing>> {
    Json(
        state
            .manager
            .registry()
            .iter()
            .map(ScenarioListing::from)
            .collect(),
    )
}

/// Returns the router for scenarios.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_scenarios))
}
