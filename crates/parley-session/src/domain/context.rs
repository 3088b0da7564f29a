//! The Visibility Filter, generator side.
//!
//! The generator sees the full ground truth of the bound character so it
//! can role-play faithfully. [`GeneratorContext`] has no field that could
//! carry the participant's hypotheses or feedback.

use std::collections::BTreeMap;

use parley_scenario::domain::character::CharacterDefinition;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::{SessionState, TurnRecord};

/// A ground-truth goal as forwarded to the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalBrief {
    /// Goal id.
    pub id: String,
    /// Ground-truth description.
    pub description: String,
}

/// One prior turn as the generator sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Turn index.
    pub turn_index: u64,
    /// What the participant did.
    pub participant_action: String,
    /// What the participant was shown.
    pub character_output: String,
}

impl HistoryEntry {
    fn from_record(record: &TurnRecord) -> Self {
        Self {
            turn_index: record.turn_index(),
            participant_action: record.participant_action().to_owned(),
            character_output: record.observable_output().to_owned(),
        }
    }

    fn char_len(&self) -> usize {
        self.participant_action.chars().count() + self.character_output.chars().count()
    }
}

/// Everything the character generator receives for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorContext {
    /// Session identifier.
    pub session_id: Uuid,
    /// Scenario identifier.
    pub scenario_id: String,
    /// Scenario rules for the generator.
    pub instructions: String,
    /// Full character definition.
    pub character: CharacterDefinition,
    /// Current attribute values, hidden ones included.
    pub character_state: BTreeMap<String, String>,
    /// The character's ground-truth goals.
    pub goals: Vec<GoalBrief>,
    /// Current world state.
    pub world: BTreeMap<String, String>,
    /// Windowed history, oldest first.
    pub history: Vec<HistoryEntry>,
    /// Number of older turns left out of `history`.
    pub evicted_turns: u64,
    /// Index the new turn will get.
    pub turn_index: u64,
    /// The action to respond to.
    pub participant_action: String,
}

impl GeneratorContext {
    /// Size of the serialized context in bytes.
    #[must_use]
    pub fn serialized_len(&self) -> usize {
        serde_json::to_vec(self).map_or(0, |bytes| bytes.len())
    }
}

/// Keeps at most `window` of the most recent turns, then drops the oldest
/// until their text fits `max_chars`. The most recent turn is never dropped.
fn window_history(
    history: &[TurnRecord],
    window: usize,
    max_chars: Option<usize>,
) -> Vec<HistoryEntry> {
    let start = history.len().saturating_sub(window.max(1));
    let mut entries: Vec<HistoryEntry> = history[start..]
        .iter()
        .map(HistoryEntry::from_record)
        .collect();

    if let Some(budget) = max_chars {
        let mut total: usize = entries.iter().map(HistoryEntry::char_len).sum();
        let mut drop = 0;
        while total > budget && entries.len() - drop > 1 {
            total -= entries[drop].char_len();
            drop += 1;
        }
        entries.drain(..drop);
    }
    entries
}

/// Builds the generator context for `participant_action` as the next turn.
#[must_use]
pub fn filter_for_character_generator(
    session: &SessionState,
    participant_action: &str,
) -> GeneratorContext {
    let scenario = session.scenario();
    let character = session.character();
    let history = window_history(
        session.history(),
        scenario.generator.history_window,
        scenario.generator.max_context_chars,
    );
    let evicted_turns = session.turn_count() - history.len() as u64;

    GeneratorContext {
        session_id: session.id(),
        scenario_id: scenario.id.clone(),
        instructions: scenario.instructions.clone(),
        character: character.clone(),
        character_state: session.attributes(),
        goals: scenario
            .goals_for(&character.id)
            .map(|g| GoalBrief {
                id: g.id.clone(),
                description: g.description.clone(),
            })
            .collect(),
        world: session.world(),
        history,
        evicted_turns,
        turn_index: session.turn_count(),
        participant_action: participant_action.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use parley_test_support::fixtures::sample_scenario;

    use super::*;

    fn session_with_turns(n: u64, scenario: parley_scenario::domain::config::ScenarioConfig) -> SessionState {
        let at = Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap();
        let mut session =
            SessionState::create(Uuid::new_v4(), Arc::new(scenario), "fp", "blob", at).unwrap();
        for i in 0..n {
            let output = format!("reply {i}");
            session
                .append_turn(TurnRecord::new(i, format!("act {i}"), &output, &output, at))
                .unwrap();
        }
        session
    }

    #[test]
    fn test_context_carries_full_ground_truth() {
        // Arrange
        let mut session = session_with_turns(1, sample_scenario());
        session.record_hypothesis("it wants light", session.started_at());

        // Act
        let context = filter_for_character_generator(&session, "I wave");

        // Assert
        assert_eq!(context.character_state.get("diet").map(String::as_str), Some("phototroph"));
        assert!(context.goals.iter().any(|g| g.id == "avoid_touch"));
        assert_eq!(context.turn_index, 1);
        assert_eq!(context.participant_action, "I wave");
        let json = serde_json::to_string(&context).unwrap();
        assert!(!json.contains("it wants light"));
    }

    #[test]
    fn test_history_is_windowed_oldest_first() {
        let mut scenario = sample_scenario();
        scenario.generator.history_window = 3;
        let session = session_with_turns(5, scenario);

        let context = filter_for_character_generator(&session, "next");

        let indices: Vec<u64> = context.history.iter().map(|h| h.turn_index).collect();
        assert_eq!(indices, vec![2, 3, 4]);
        assert_eq!(context.evicted_turns, 2);
    }

    #[test]
    fn test_char_budget_never_drops_the_latest_turn() {
        // Arrange
        let mut scenario = sample_scenario();
        scenario.generator.history_window = 10;
        scenario.generator.max_context_chars = Some(1);
        let session = session_with_turns(4, scenario);

        // Act
        let context = filter_for_character_generator(&session, "next");

        // Assert
        assert_eq!(context.history.len(), 1);
        assert_eq!(context.history[0].turn_index, 3);
        assert_eq!(context.evicted_turns, 3);
    }

    #[test]
    fn test_char_budget_keeps_turns_that_fit() {
        let mut scenario = sample_scenario();
        scenario.generator.history_window = 10;
        // "act i" + "reply i" is 12 characters per turn.
        scenario.generator.max_context_chars = Some(24);
        let session = session_with_turns(4, scenario);

        let context = filter_for_character_generator(&session, "next");

        let indices: Vec<u64> = context.history.iter().map(|h| h.turn_index).collect();
        assert_eq!(indices, vec![2, 3]);
    }

    #[test]
    fn test_first_turn_has_empty_history() {
        let session = session_with_turns(0, sample_scenario());

        let context = filter_for_character_generator(&session, "hello");

        assert!(context.history.is_empty());
        assert_eq!(context.evicted_turns, 0);
        assert!(context.serialized_len() > 0);
    }
}
