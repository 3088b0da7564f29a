//! Versioned serialized form of a session and the checks applied when it
//! is loaded back.
//!
//! A restored session must satisfy every invariant a live one does. Any
//! violation is reported as `CorruptedSession`; nothing is repaired.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use parley_core::error::EngineError;
use parley_core::repository::StoredSession;
use parley_scenario::application::registry::ScenarioRegistry;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::state::{
    FeedbackNote, Hypothesis, SessionState, SessionStatus, TerminationReason, TurnPhase,
    TurnRecord,
};

/// Current persisted format version.
pub const PERSISTED_FORMAT: u32 = 1;

/// The serialized session payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    /// Format version.
    pub format: u32,
    /// Session identifier.
    pub session_id: Uuid,
    /// Bound scenario.
    pub scenario_id: String,
    /// Scenario fingerprint at binding time.
    pub scenario_fingerprint: String,
    /// Bound character.
    pub character_id: String,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Turn phase.
    pub phase: TurnPhase,
    /// Turn history.
    pub history: Vec<TurnRecord>,
    /// Hypotheses.
    pub hypotheses: Vec<Hypothesis>,
    /// Feedback notes.
    #[serde(default)]
    pub feedback: Vec<FeedbackNote>,
    /// Start time.
    pub started_at: DateTime<Utc>,
    /// End time.
    pub ended_at: Option<DateTime<Utc>>,
    /// Termination reason.
    pub termination: Option<TerminationReason>,
    /// Set when the session was flagged unusable.
    #[serde(default)]
    pub unusable: Option<String>,
}

impl PersistedSession {
    /// Captures a session.
    #[must_use]
    pub fn capture(session: &SessionState) -> Self {
        Self {
            format: PERSISTED_FORMAT,
            session_id: session.id,
            scenario_id: session.scenario.id.clone(),
            scenario_fingerprint: session.fingerprint.clone(),
            character_id: session.character.id.clone(),
            status: session.status,
            phase: session.phase,
            history: session.history.clone(),
            hypotheses: session.hypotheses.clone(),
            feedback: session.feedback.clone(),
            started_at: session.started_at,
            ended_at: session.ended_at,
            termination: session.termination,
            unusable: session.unusable.clone(),
        }
    }

    /// Rebuilds the session, re-binding it to the registered scenario.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::CorruptedSession` if any invariant is violated.
    pub fn restore(self, registry: &ScenarioRegistry) -> Result<SessionState, EngineError> {
        let id = self.session_id;
        let corrupted = |reason: String| EngineError::CorruptedSession {
            session_id: id,
            reason,
        };

        if self.format != PERSISTED_FORMAT {
            return Err(corrupted(format!("unsupported format {}", self.format)));
        }
        if let Some(reason) = &self.unusable {
            return Err(corrupted(format!("session was flagged unusable: {reason}")));
        }
        let registered = registry
            .get(&self.scenario_id)
            .map_err(|_| corrupted(format!("unknown scenario '{}'", self.scenario_id)))?;
        if registered.fingerprint != self.scenario_fingerprint {
            return Err(corrupted(format!(
                "scenario '{}' changed since the session started",
                self.scenario_id
            )));
        }
        let scenario = registered.config.clone();
        let character = scenario
            .character(&self.character_id)
            .cloned()
            .ok_or_else(|| corrupted(format!("unknown character '{}'", self.character_id)))?;

        check_history(&self.history).map_err(&corrupted)?;
        check_lifecycle(&self).map_err(&corrupted)?;
        let turn_count = self.history.len() as u64;
        if turn_count > scenario.limits.max_turns {
            return Err(corrupted(format!(
                "{turn_count} turns exceed the limit of {}",
                scenario.limits.max_turns
            )));
        }

        let session = SessionState {
            id,
            scenario,
            fingerprint: self.scenario_fingerprint,
            character,
            status: self.status,
            phase: self.phase,
            history: self.history,
            hypotheses: self.hypotheses,
            feedback: self.feedback,
            started_at: self.started_at,
            ended_at: self.ended_at,
            termination: self.termination,
            unusable: None,
        };
        check_effects(&session).map_err(&corrupted)?;
        Ok(session)
    }
}

fn check_history(history: &[TurnRecord]) -> Result<(), String> {
    for (position, record) in history.iter().enumerate() {
        if record.turn_index() != position as u64 {
            return Err(format!(
                "turn at position {position} has index {}",
                record.turn_index()
            ));
        }
    }
    Ok(())
}

fn check_lifecycle(persisted: &PersistedSession) -> Result<(), String> {
    let turn_count = persisted.history.len() as u64;
    let mut previous = 0;
    for hypothesis in &persisted.hypotheses {
        if hypothesis.declared_at_turn > turn_count {
            return Err(format!(
                "hypothesis declared at turn {} but only {turn_count} turns exist",
                hypothesis.declared_at_turn
            ));
        }
        if hypothesis.declared_at_turn < previous {
            return Err("hypotheses are out of order".to_owned());
        }
        previous = hypothesis.declared_at_turn;
    }
    if persisted.feedback.iter().any(|f| f.after_turn > turn_count) {
        return Err("feedback refers to a future turn".to_owned());
    }

    let terminated_fields = persisted.ended_at.is_some() && persisted.termination.is_some();
    let live_fields = persisted.ended_at.is_none() && persisted.termination.is_none();
    let consistent = match persisted.status {
        SessionStatus::Terminated => persisted.phase == TurnPhase::Terminated && terminated_fields,
        SessionStatus::Active | SessionStatus::Suspended => {
            persisted.phase == TurnPhase::AwaitingParticipantAction && live_fields
        }
    };
    if !consistent {
        return Err(format!(
            "status {:?} is inconsistent with phase {:?}",
            persisted.status, persisted.phase
        ));
    }
    Ok(())
}

/// Every recorded effect must come from an applicable trigger, match one of
/// its declared effects, and each trigger may fire on one turn only.
fn check_effects(session: &SessionState) -> Result<(), String> {
    let mut fired_on: HashSet<&str> = HashSet::new();
    for record in session.history() {
        let mut this_turn: HashSet<&str> = HashSet::new();
        for applied in record.effects() {
            let trigger = session
                .scenario()
                .triggers_for(&session.character().id)
                .find(|t| t.id == applied.trigger_id)
                .ok_or_else(|| {
                    format!(
                        "turn {} applies effects of unknown trigger '{}'",
                        record.turn_index(),
                        applied.trigger_id
                    )
                })?;
            if !trigger.effects.contains(&applied.effect) {
                return Err(format!(
                    "turn {} applies an effect trigger '{}' does not declare",
                    record.turn_index(),
                    trigger.id
                ));
            }
            if fired_on.contains(trigger.id.as_str()) {
                return Err(format!("trigger '{}' fired more than once", trigger.id));
            }
            this_turn.insert(trigger.id.as_str());
        }
        fired_on.extend(this_turn);
    }
    Ok(())
}

/// Serializes a session into a store row.
///
/// # Errors
///
/// Returns `EngineError::Infrastructure` if serialization fails.
pub fn to_stored(session: &SessionState, saved_at: DateTime<Utc>) -> Result<StoredSession, EngineError> {
    let payload = serde_json::to_value(PersistedSession::capture(session))
        .map_err(|e| EngineError::Infrastructure(format!("session serialization failed: {e}")))?;
    Ok(StoredSession {
        session_id: session.id(),
        scenario_id: session.scenario().id.clone(),
        turn_count: session.turn_count(),
        status: session.status().as_str().to_owned(),
        payload,
        saved_at,
    })
}

/// Deserializes and validates a store row.
///
/// # Errors
///
/// Returns `EngineError::CorruptedSession` if the payload is unreadable,
/// belongs to another session, or violates a session invariant.
pub fn from_stored(
    stored: &StoredSession,
    registry: &ScenarioRegistry,
) -> Result<SessionState, EngineError> {
    let persisted: PersistedSession =
        serde_json::from_value(stored.payload.clone()).map_err(|e| {
            EngineError::CorruptedSession {
                session_id: stored.session_id,
                reason: format!("unreadable payload: {e}"),
            }
        })?;
    if persisted.session_id != stored.session_id {
        return Err(EngineError::CorruptedSession {
            session_id: stored.session_id,
            reason: format!("payload belongs to session {}", persisted.session_id),
        });
    }
    persisted.restore(registry)
}
