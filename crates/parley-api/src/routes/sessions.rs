//! Routes for the session lifecycle.
//!
//! Every handler builds a command with a fresh correlation id and hands it
//! to the `SessionManager`; the manager's errors map to HTTP statuses in
//! `ApiError`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{
    Json, Router,
    routing::{get, post},
};
use parley_session::domain::commands::{
    DeclareHypothesis, EndSession, ResumeSession, StartSession, SubmitAction, SuspendSession,
};
use parley_session::domain::observable::ActionOutcome;
use parley_session::domain::scoring::ScoreResult;
use parley_session::domain::state::SessionSummary;
use parley_session::domain::visibility::ParticipantView;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Scenario to play.
    pub scenario_id: String,
    /// Character to bind; random when omitted.
    #[serde(default)]
    pub character_id: Option<String>,
}

/// Request body carrying participant text.
#[derive(Debug, Deserialize)]
pub struct TextRequest {
    /// The participant's input.
    pub text: String,
}

/// Response body for POST /{id}/hypotheses.
#[derive(Debug, Serialize)]
pub struct HypothesisResponse {
    /// Turns observed when the hypothesis was declared.
    pub declared_at_turn: u64,
}

/// POST /
#[instrument(skip(state, request), fields(scenario_id = %request.scenario_id))]
async fn start_session(
    State(state): State<AppState>,
    Json(request): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<SessionSummary>), ApiError> {
    let command = StartSession {
        correlation_id: Uuid::new_v4(),
        scenario_id: request.scenario_id,
        character_id: request.character_id,
    };

    info!(correlation_id = %command.correlation_id, "handling start_session command");

    let summary = state.manager.start_session(&command).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// GET /{id}
async fn get_summary(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionSummary>, ApiError> {
    Ok(Json(state.manager.summary(session_id).await?))
}

/// GET /{id}/view
async fn get_view(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ParticipantView>, ApiError> {
    Ok(Json(state.manager.participant_view(session_id).await?))
}

/// POST /{id}/actions
#[instrument(skip(state, request), fields(session_id = %session_id))]
async fn submit_action(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<TextRequest>,
) -> Result<Json<ActionOutcome>, ApiError> {
    let command = SubmitAction {
        correlation_id: Uuid::new_v4(),
        session_id,
        text: request.text,
    };

    info!(correlation_id = %command.correlation_id, "handling submit_action command");

    Ok(Json(state.manager.submit_action(&command).await?))
}

/// POST /{id}/hypotheses
#[instrument(skip(state, request), fields(session_id = %session_id))]
async fn declare_hypothesis(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<TextRequest>,
) -> Result<Json<HypothesisResponse>, ApiError> {
    let command = DeclareHypothesis {
        correlation_id: Uuid::new_v4(),
        session_id,
        text: request.text,
    };

    info!(correlation_id = %command.correlation_id, "handling declare_hypothesis command");

    let declared_at_turn = state.manager.declare_hypothesis(&command).await?;
    Ok(Json(HypothesisResponse { declared_at_turn }))
}

/// POST /{id}/suspend
#[instrument(skip(state), fields(session_id = %session_id))]
async fn suspend_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionSummary>, ApiError> {
    let command = SuspendSession {
        correlation_id: Uuid::new_v4(),
        session_id,
    };

    info!(correlation_id = %command.correlation_id, "handling suspend_session command");

    Ok(Json(state.manager.suspend_session(&command).await?))
}

/// POST /{id}/resume
#[instrument(skip(state), fields(session_id = %session_id))]
async fn resume_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionSummary>, ApiError> {
    let command = ResumeSession {
        correlation_id: Uuid::new_v4(),
        session_id,
    };

    info!(correlation_id = %command.correlation_id, "handling resume_session command");

    Ok(Json(state.manager.resume_session(&command).await?))
}

/// POST /{id}/end
#[instrument(skip(state), fields(session_id = %session_id))]
async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ScoreResult>, ApiError> {
    let command = EndSession {
        correlation_id: Uuid::new_v4(),
        session_id,
    };

    info!(correlation_id = %command.correlation_id, "handling end_session command");

    Ok(Json(state.manager.end_session(&command).await?))
}

/// GET /{id}/score
async fn get_score(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ScoreResult>, ApiError> {
    Ok(Json(state.manager.score(session_id).await?))
}

/// Returns the router for sessions.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(start_session))
        .route("/{id}", get(get_summary))
        .route("/{id}/view", get(get_view))
        .route("/{id}/actions", post(submit_action))
        .route("/{id}/hypotheses", post(declare_hypothesis))
        .route("/{id}/suspend", post(suspend_session))
        .route("/{id}/resume", post(resume_session))
        .route("/{id}/end", post(end_session))
        .route("/{id}/score", get(get_score))
}
