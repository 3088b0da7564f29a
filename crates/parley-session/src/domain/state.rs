//! The Session State Store: one canonical, append-only record per session.
//!
//! Everything the engine knows about a session lives in [`SessionState`].
//! Current world state and attribute values are not stored separately;
//! they are folded from the scenario defaults and the effects recorded on
//! each turn, so the value at any history prefix can be recomputed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parley_core::error::EngineError;
use parley_scenario::domain::character::CharacterDefinition;
use parley_scenario::domain::condition::TurnFacts;
use parley_scenario::domain::config::ScenarioConfig;
use parley_scenario::domain::trigger::Effect;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Live and accepting actions.
    Active,
    /// Persisted and released from memory.
    Suspended,
    /// Finished; only scoring and inspection remain.
    Terminated,
}

impl SessionStatus {
    /// Stable lowercase name, as stored in session indexes.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Terminated => "terminated",
        }
    }
}

/// Turn state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// Ready for the next participant action.
    AwaitingParticipantAction,
    /// Waiting on the character generator.
    GeneratingCharacterResponse,
    /// Applying triggers and appending the turn.
    UpdatingState,
    /// The turn has been recorded and returned.
    Delivered,
    /// No further actions are accepted.
    Terminated,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The scenario's turn limit was reached.
    TurnLimitReached,
    /// The scenario's duration limit elapsed.
    TimeLimitReached,
    /// The participant issued an end-session command.
    ParticipantEnded,
    /// The session was ended through the lifecycle manager.
    Forced,
}

/// A trigger effect applied on a particular turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedEffect {
    /// The trigger that fired.
    pub trigger_id: String,
    /// The effect it applied.
    pub effect: Effect,
}

/// One completed turn. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    turn_index: u64,
    participant_action: String,
    raw_output: String,
    observable_output: String,
    recorded_at: DateTime<Utc>,
    #[serde(default)]
    effects: Vec<AppliedEffect>,
}

impl TurnRecord {
    pub(crate) fn new(
        turn_index: u64,
        participant_action: impl Into<String>,
        raw_output: impl Into<String>,
        observable_output: impl Into<String>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            turn_index,
            participant_action: participant_action.into(),
            raw_output: raw_output.into(),
            observable_output: observable_output.into(),
            recorded_at,
            effects: Vec::new(),
        }
    }

    pub(crate) fn with_effects(mut self, effects: Vec<AppliedEffect>) -> Self {
        self.effects = effects;
        self
    }

    /// Zero-based, gap-free turn index.
    #[must_use]
    pub fn turn_index(&self) -> u64 {
        self.turn_index
    }

    /// The participant's action text.
    #[must_use]
    pub fn participant_action(&self) -> &str {
        &self.participant_action
    }

    /// The generator's output, verbatim.
    #[must_use]
    pub fn raw_output(&self) -> &str {
        &self.raw_output
    }

    /// What the participant was shown.
    #[must_use]
    pub fn observable_output(&self) -> &str {
        &self.observable_output
    }

    /// When the turn was recorded.
    #[must_use]
    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    /// Trigger effects applied on this turn.
    #[must_use]
    pub fn effects(&self) -> &[AppliedEffect] {
        &self.effects
    }
}

impl TurnFacts for TurnRecord {
    fn turn_index(&self) -> u64 {
        self.turn_index
    }

    fn participant_action(&self) -> &str {
        &self.participant_action
    }

    fn character_output(&self) -> &str {
        &self.observable_output
    }
}

/// A participant's guess about the character's goals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hypothesis {
    /// Number of turns the participant had observed when declaring.
    pub declared_at_turn: u64,
    /// The guess, verbatim.
    pub text: String,
    /// Wall-clock declaration time.
    pub declared_at: DateTime<Utc>,
}

/// Free-form participant feedback. Never scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackNote {
    /// Number of turns observed when the note was left.
    pub after_turn: u64,
    /// The note, verbatim.
    pub text: String,
    /// Wall-clock time.
    pub recorded_at: DateTime<Utc>,
}

/// Owned read-only snapshot of a session's headline facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session identifier.
    pub session_id: Uuid,
    /// Bound scenario.
    pub scenario_id: String,
    /// Bound character.
    pub character_id: String,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Turn phase.
    pub phase: TurnPhase,
    /// Completed turns.
    pub turn_count: u64,
    /// Turns left before the turn limit.
    pub turns_remaining: u64,
    /// Declared hypotheses.
    pub hypothesis_count: usize,
    /// Start time.
    pub started_at: DateTime<Utc>,
    /// End time, once terminated.
    pub ended_at: Option<DateTime<Utc>>,
    /// Termination reason, once terminated.
    pub termination: Option<TerminationReason>,
}

/// The per-session record.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub(crate) id: Uuid,
    pub(crate) scenario: Arc<ScenarioConfig>,
    pub(crate) fingerprint: String,
    pub(crate) character: CharacterDefinition,
    pub(crate) status: SessionStatus,
    pub(crate) phase: TurnPhase,
    pub(crate) history: Vec<TurnRecord>,
    pub(crate) hypotheses: Vec<Hypothesis>,
    pub(crate) feedback: Vec<FeedbackNote>,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) ended_at: Option<DateTime<Utc>>,
    pub(crate) termination: Option<TerminationReason>,
    pub(crate) unusable: Option<String>,
}

impl SessionState {
    /// Creates an active session bound to `character_id` of `scenario`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if the scenario has no such
    /// character.
    pub fn create(
        id: Uuid,
        scenario: Arc<ScenarioConfig>,
        fingerprint: impl Into<String>,
        character_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<Self, EngineError> {
        let character = scenario.character(character_id).cloned().ok_or_else(|| {
            EngineError::Configuration(format!(
                "scenario '{}' has no character '{character_id}'",
                scenario.id
            ))
        })?;
        Ok(Self {
            id,
            scenario,
            fingerprint: fingerprint.into(),
            character,
            status: SessionStatus::Active,
            phase: TurnPhase::AwaitingParticipantAction,
            history: Vec::new(),
            hypotheses: Vec::new(),
            feedback: Vec::new(),
            started_at,
            ended_at: None,
            termination: None,
            unusable: None,
        })
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The bound scenario.
    #[must_use]
    pub fn scenario(&self) -> &ScenarioConfig {
        &self.scenario
    }

    /// Fingerprint of the scenario at binding time.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The bound character.
    #[must_use]
    pub fn character(&self) -> &CharacterDefinition {
        &self.character
    }

    /// Lifecycle status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Turn phase.
    #[must_use]
    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// The full, ordered turn history.
    #[must_use]
    pub fn history(&self) -> &[TurnRecord] {
        &self.history
    }

    /// Declared hypotheses in declaration order.
    #[must_use]
    pub fn hypotheses(&self) -> &[Hypothesis] {
        &self.hypotheses
    }

    /// Feedback notes in order.
    #[must_use]
    pub fn feedback(&self) -> &[FeedbackNote] {
        &self.feedback
    }

    /// Start time.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// End time, once terminated.
    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Termination reason, once terminated.
    #[must_use]
    pub fn termination(&self) -> Option<TerminationReason> {
        self.termination
    }

    /// Why the session was flagged unusable, if it was.
    #[must_use]
    pub fn unusable_reason(&self) -> Option<&str> {
        self.unusable.as_deref()
    }

    /// Number of completed turns.
    #[must_use]
    pub fn turn_count(&self) -> u64 {
        self.history.len() as u64
    }

    /// Whether the session has terminated.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.status == SessionStatus::Terminated
    }

    /// Turns left before the scenario's turn limit.
    #[must_use]
    pub fn turns_remaining(&self) -> u64 {
        self.scenario
            .limits
            .max_turns
            .saturating_sub(self.turn_count())
    }

    /// World state after the first `turn_count` turns.
    #[must_use]
    pub fn world_at(&self, turn_count: u64) -> BTreeMap<String, String> {
        let mut world = self.scenario.world.clone();
        for applied in self.applied_effects(turn_count) {
            if let Effect::SetWorld { key, value } = &applied.effect {
                world.insert(key.clone(), value.clone());
            }
        }
        world
    }

    /// Current world state.
    #[must_use]
    pub fn world(&self) -> BTreeMap<String, String> {
        self.world_at(self.turn_count())
    }

    /// Character attribute values after the first `turn_count` turns.
    #[must_use]
    pub fn attributes_at(&self, turn_count: u64) -> BTreeMap<String, String> {
        let mut attributes = self.character.attributes.clone();
        for applied in self.applied_effects(turn_count) {
            if let Effect::SetAttribute { name, value } = &applied.effect {
                attributes.insert(name.clone(), value.clone());
            }
        }
        attributes
    }

    /// Current character attribute values.
    #[must_use]
    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.attributes_at(self.turn_count())
    }

    /// Ids of triggers that have already fired.
    #[must_use]
    pub fn fired_triggers(&self) -> BTreeSet<&str> {
        self.history
            .iter()
            .flat_map(|t| t.effects.iter().map(|e| e.trigger_id.as_str()))
            .collect()
    }

    /// Headline facts as an owned snapshot.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id,
            scenario_id: self.scenario.id.clone(),
            character_id: self.character.id.clone(),
            status: self.status,
            phase: self.phase,
            turn_count: self.turn_count(),
            turns_remaining: self.turns_remaining(),
            hypothesis_count: self.hypotheses.len(),
            started_at: self.started_at,
            ended_at: self.ended_at,
            termination: self.termination,
        }
    }

    fn applied_effects(&self, turn_count: u64) -> impl Iterator<Item = &AppliedEffect> {
        let end = usize::try_from(turn_count)
            .unwrap_or(usize::MAX)
            .min(self.history.len());
        self.history[..end].iter().flat_map(|t| t.effects.iter())
    }

    /// Appends a turn, enforcing the gap-free index sequence.
    pub(crate) fn append_turn(&mut self, record: TurnRecord) -> Result<(), EngineError> {
        let expected = self.turn_count();
        if record.turn_index != expected {
            return Err(EngineError::InvalidTurnSequence {
                expected,
                actual: record.turn_index,
            });
        }
        self.history.push(record);
        Ok(())
    }

    /// Appends a hypothesis stamped with the turns observed so far.
    pub(crate) fn record_hypothesis(
        &mut self,
        text: impl Into<String>,
        declared_at: DateTime<Utc>,
    ) -> &Hypothesis {
        let hypothesis = Hypothesis {
            declared_at_turn: self.turn_count(),
            text: text.into(),
            declared_at,
        };
        self.hypotheses.push(hypothesis);
        &self.hypotheses[self.hypotheses.len() - 1]
    }

    pub(crate) fn record_feedback(&mut self, text: impl Into<String>, recorded_at: DateTime<Utc>) {
        self.feedback.push(FeedbackNote {
            after_turn: self.turn_count(),
            text: text.into(),
            recorded_at,
        });
    }

    pub(crate) fn set_phase(&mut self, phase: TurnPhase) {
        self.phase = phase;
    }

    /// Moves to `Terminated`. No-op when already terminated.
    pub(crate) fn terminate(&mut self, reason: TerminationReason, at: DateTime<Utc>) -> bool {
        if self.is_terminated() {
            return false;
        }
        self.status = SessionStatus::Terminated;
        self.phase = TurnPhase::Terminated;
        self.ended_at = Some(at);
        self.termination = Some(reason);
        true
    }

    pub(crate) fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
    }

    pub(crate) fn mark_unusable(&mut self, reason: impl Into<String>) {
        self.unusable = Some(reason.into());
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use parley_test_support::fixtures::sample_scenario;

    use super::*;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 10, minute, 0).unwrap()
    }

    fn blob_session() -> SessionState {
        SessionState::create(
            Uuid::new_v4(),
            Arc::new(sample_scenario()),
            "fp",
            "blob",
            at(0),
        )
        .unwrap()
    }

    #[test]
    fn test_create_starts_active_with_empty_history() {
        // Arrange / Act
        let session = blob_session();

        // Assert
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.phase(), TurnPhase::AwaitingParticipantAction);
        assert_eq!(session.turn_count(), 0);
        assert!(session.hypotheses().is_empty());
        assert_eq!(session.character().id, "blob");
    }

    #[test]
    fn test_create_rejects_unknown_character() {
        let result = SessionState::create(
            Uuid::new_v4(),
            Arc::new(sample_scenario()),
            "fp",
            "ghost",
            at(0),
        );

        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_append_turn_accepts_consecutive_indices() {
        let mut session = blob_session();

        session
            .append_turn(TurnRecord::new(0, "wave", "It wobbles.", "It wobbles.", at(1)))
            .unwrap();
        session
            .append_turn(TurnRecord::new(1, "wait", "It rests.", "It rests.", at(2)))
            .unwrap();

        let indices: Vec<u64> = session.history().iter().map(TurnRecord::turn_index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_append_turn_rejects_a_gap() {
        // Arrange
        let mut session = blob_session();
        session
            .append_turn(TurnRecord::new(0, "wave", "ok", "ok", at(1)))
            .unwrap();

        // Act
        let result = session.append_turn(TurnRecord::new(2, "skip", "ok", "ok", at(2)));

        // Assert
        assert!(matches!(
            result,
            Err(EngineError::InvalidTurnSequence {
                expected: 1,
                actual: 2
            })
        ));
        assert_eq!(session.turn_count(), 1);
    }

    #[test]
    fn test_hypotheses_are_appended_with_turns_observed() {
        let mut session = blob_session();
        session.record_hypothesis("it wants food", at(1));
        session
            .append_turn(TurnRecord::new(0, "wave", "ok", "ok", at(2)))
            .unwrap();

        session.record_hypothesis("it wants light", at(3));

        let turns: Vec<u64> = session
            .hypotheses()
            .iter()
            .map(|h| h.declared_at_turn)
            .collect();
        assert_eq!(turns, vec![0, 1]);
    }

    #[test]
    fn test_world_and_attributes_are_folded_from_effects() {
        // Arrange
        let mut session = blob_session();
        let effects = vec![
            AppliedEffect {
                trigger_id: "lamp_on".into(),
                effect: Effect::SetWorld {
                    key: "lamp".into(),
                    value: "on".into(),
                },
            },
            AppliedEffect {
                trigger_id: "lamp_on".into(),
                effect: Effect::SetAttribute {
                    name: "mood".into(),
                    value: "excited".into(),
                },
            },
        ];
        session
            .append_turn(TurnRecord::new(0, "wave", "ok", "ok", at(1)))
            .unwrap();
        session
            .append_turn(
                TurnRecord::new(1, "flip the switch", "ok", "ok", at(2)).with_effects(effects),
            )
            .unwrap();

        // Act / Assert
        assert_eq!(session.world_at(1).get("lamp").map(String::as_str), Some("off"));
        assert_eq!(session.world().get("lamp").map(String::as_str), Some("on"));
        assert_eq!(
            session.attributes_at(1).get("mood").map(String::as_str),
            Some("curious")
        );
        assert_eq!(
            session.attributes().get("mood").map(String::as_str),
            Some("excited")
        );
        assert!(session.fired_triggers().contains("lamp_on"));
    }

    #[test]
    fn test_terminate_is_idempotent() {
        let mut session = blob_session();

        let first = session.terminate(TerminationReason::Forced, at(5));
        let second = session.terminate(TerminationReason::ParticipantEnded, at(6));

        assert!(first);
        assert!(!second);
        assert_eq!(session.termination(), Some(TerminationReason::Forced));
        assert_eq!(session.ended_at(), Some(at(5)));
        assert_eq!(session.phase(), TurnPhase::Terminated);
    }

    #[test]
    fn test_summary_reports_turns_remaining() {
        let mut session = blob_session();
        session
            .append_turn(TurnRecord::new(0, "wave", "ok", "ok", at(1)))
            .unwrap();

        let summary = session.summary();

        assert_eq!(summary.turn_count, 1);
        assert_eq!(summary.turns_remaining, session.scenario().limits.max_turns - 1);
        assert_eq!(summary.scenario_id, session.scenario().id);
    }
}
