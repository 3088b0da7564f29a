//! The Visibility Filter, participant side.
//!
//! Pure functions of the scenario rules and the session history. A target
//! without a rule is hidden. `revealed_on` conditions are evaluated over a
//! history prefix, so the view "as it stood after `k` turns" never depends
//! on later turns.

use std::collections::BTreeMap;

use parley_scenario::domain::visibility::{RuleTarget, Visibility};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::observable::ObservableStep;
use super::state::{SessionState, TurnRecord};

/// A goal the participant is allowed to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedGoal {
    /// Goal id.
    pub goal_id: String,
    /// Ground-truth description.
    pub description: String,
}

/// What the participant may know after a given number of turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    /// Session identifier.
    pub session_id: Uuid,
    /// Number of turns the view reflects.
    pub as_of_turn_count: u64,
    /// Visible attributes and their values at that point.
    pub attributes: BTreeMap<String, String>,
    /// Revealed goals, in authoring order.
    pub revealed_goals: Vec<RevealedGoal>,
}

fn prefix(session: &SessionState, turn_count: u64) -> &[TurnRecord] {
    let end = usize::try_from(turn_count)
        .unwrap_or(usize::MAX)
        .min(session.history().len());
    &session.history()[..end]
}

/// Whether `target` of the bound character is visible after `turn_count`
/// turns.
#[must_use]
pub fn is_visible_at(session: &SessionState, target: &RuleTarget, turn_count: u64) -> bool {
    let Some(rule) = session.scenario().rule_for(&session.character().id, target) else {
        return false;
    };
    match &rule.visibility {
        Visibility::AlwaysHidden => false,
        Visibility::AlwaysVisible => true,
        Visibility::RevealedOn(condition) => condition.holds(prefix(session, turn_count)),
    }
}

/// Number of turns after which `target` first became visible, or `None`
/// while it is still hidden. Always-visible targets report `0`.
#[must_use]
pub fn revealed_at_turn(session: &SessionState, target: &RuleTarget) -> Option<u64> {
    let rule = session
        .scenario()
        .rule_for(&session.character().id, target)?;
    match &rule.visibility {
        Visibility::AlwaysHidden => None,
        Visibility::AlwaysVisible => Some(0),
        Visibility::RevealedOn(condition) => condition
            .first_satisfied_at(session.history())
            .map(|turn_index| turn_index + 1),
    }
}

/// The participant view after the first `turn_count` turns.
#[must_use]
pub fn participant_view_at(session: &SessionState, turn_count: u64) -> ParticipantView {
    let turn_count = turn_count.min(session.turn_count());
    let attributes = session
        .attributes_at(turn_count)
        .into_iter()
        .filter(|(name, _)| {
            is_visible_at(session, &RuleTarget::Attribute(name.clone()), turn_count)
        })
        .collect();
    let character_id = &session.character().id;
    let revealed_goals = session
        .scenario()
        .goals_for(character_id)
        .filter(|goal| is_visible_at(session, &RuleTarget::Goal(goal.id.clone()), turn_count))
        .map(|goal| RevealedGoal {
            goal_id: goal.id.clone(),
            description: goal.description.clone(),
        })
        .collect();

    ParticipantView {
        session_id: session.id(),
        as_of_turn_count: turn_count,
        attributes,
        revealed_goals,
    }
}

/// The current participant view.
#[must_use]
pub fn participant_view(session: &SessionState) -> ParticipantView {
    participant_view_at(session, session.turn_count())
}

/// Every target that is visible after `after` turns but was not after
/// `before` turns.
fn newly_revealed(session: &SessionState, before: u64, after: u64) -> Vec<RuleTarget> {
    let character_id = &session.character().id;
    session
        .scenario()
        .visibility
        .iter()
        .filter(|rule| &rule.character_id == character_id)
        .map(|rule| &rule.target)
        .filter(|target| {
            is_visible_at(session, target, after) && !is_visible_at(session, target, before)
        })
        .cloned()
        .collect()
}

/// Builds the participant-facing result of `record`, which must already be
/// part of the session history.
#[must_use]
pub fn filter_for_participant(session: &SessionState, record: &TurnRecord) -> ObservableStep {
    let after = record.turn_index() + 1;
    let view = participant_view_at(session, after);
    ObservableStep {
        session_id: session.id(),
        turn_index: record.turn_index(),
        output: record.observable_output().to_owned(),
        attributes: view.attributes,
        revealed_goals: view.revealed_goals,
        newly_revealed: newly_revealed(session, record.turn_index(), after),
        turns_remaining: session.scenario().limits.max_turns.saturating_sub(after),
        terminated: session.termination(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use parley_test_support::fixtures::sample_scenario;

    use super::*;

    fn session() -> SessionState {
        SessionState::create(
            Uuid::new_v4(),
            Arc::new(sample_scenario()),
            "fp",
            "blob",
            Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn play(session: &mut SessionState, action: &str, output: &str) {
        let index = session.turn_count();
        let at = session.started_at();
        session
            .append_turn(TurnRecord::new(index, action, output, output, at))
            .unwrap();
    }

    #[test]
    fn test_always_visible_attribute_is_shown_and_always_hidden_is_not() {
        // Arrange
        let session = session();

        // Act
        let view = participant_view(&session);

        // Assert
        assert_eq!(view.attributes.get("mood").map(String::as_str), Some("curious"));
        assert!(!view.attributes.contains_key("diet"));
    }

    #[test]
    fn test_attribute_without_rule_is_hidden() {
        let session = session();

        let visible = is_visible_at(&session, &RuleTarget::Attribute("texture".into()), 0);

        assert!(!visible);
    }

    #[test]
    fn test_goal_is_revealed_only_after_its_turn() {
        // Arrange
        let mut session = session();
        for action in ["wave", "wait", "watch"] {
            play(&mut session, action, "It drifts.");
        }
        let target = RuleTarget::Goal("seek_light".into());

        // Act / Assert
        assert!(participant_view_at(&session, 2).revealed_goals.is_empty());
        assert_eq!(participant_view_at(&session, 3).revealed_goals.len(), 1);
        assert_eq!(revealed_at_turn(&session, &target), Some(3));
        assert!(!is_visible_at(&session, &RuleTarget::Goal("avoid_touch".into()), 3));
    }

    #[test]
    fn test_action_condition_reveals_attribute_from_that_turn_on() {
        let mut session = session();
        play(&mut session, "wave", "It wobbles.");
        play(&mut session, "I measure it with a ruler", "It stays still.");

        assert!(!participant_view_at(&session, 1).attributes.contains_key("size"));
        assert!(participant_view_at(&session, 2).attributes.contains_key("size"));
    }

    #[test]
    fn test_filter_for_participant_lists_newly_revealed_targets() {
        // Arrange
        let mut session = session();
        play(&mut session, "wave", "It wobbles.");
        play(&mut session, "measure it", "It holds still.");
        let record = session.history()[1].clone();

        // Act
        let step = filter_for_participant(&session, &record);

        // Assert
        assert_eq!(step.turn_index, 1);
        assert_eq!(step.newly_revealed, vec![RuleTarget::Attribute("size".into())]);
        assert_eq!(
            step.turns_remaining,
            session.scenario().limits.max_turns - 2
        );
        assert!(step.terminated.is_none());
    }

    #[test]
    fn test_view_is_deterministic() {
        let mut session = session();
        play(&mut session, "measure", "ok");

        assert_eq!(participant_view(&session), participant_view(&session));
    }
}
