//! Conditions over a session's turn history.
//!
//! Conditions drive both `revealed_on` visibility rules and world-state
//! triggers. Every variant is monotone: once a history prefix satisfies a
//! condition, every longer prefix does too. That lets callers ask "was this
//! true after `n` turns?" by evaluating a prefix of the history.

use serde::{Deserialize, Serialize};

/// The facts about a recorded turn that conditions may inspect.
pub trait TurnFacts {
    /// Zero-based turn index.
    fn turn_index(&self) -> u64;
    /// The participant's action text for the turn.
    fn participant_action(&self) -> &str;
    /// The character output delivered to the participant.
    fn character_output(&self) -> &str;
}

impl<T: TurnFacts + ?Sized> TurnFacts for &T {
    fn turn_index(&self) -> u64 {
        (**self).turn_index()
    }

    fn participant_action(&self) -> &str {
        (**self).participant_action()
    }

    fn character_output(&self) -> &str {
        (**self).character_output()
    }
}

/// A predicate over the turn history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// A turn with index `>= n` has been recorded.
    AfterTurn(u64),
    /// Some participant action contains the text (case-insensitive).
    ActionContains(String),
    /// Some delivered character output contains the text (case-insensitive).
    ResponseContains(String),
    /// At least one nested condition holds.
    Any(Vec<Condition>),
    /// Every nested condition holds.
    All(Vec<Condition>),
}

impl Condition {
    /// Evaluates the condition against `turns`, the history in order.
    #[must_use]
    pub fn holds<T: TurnFacts>(&self, turns: &[T]) -> bool {
        match self {
            Self::AfterTurn(n) => turns.last().is_some_and(|t| t.turn_index() >= *n),
            Self::ActionContains(needle) => {
                let needle = needle.to_lowercase();
                turns
                    .iter()
                    .any(|t| t.participant_action().to_lowercase().contains(&needle))
            }
            Self::ResponseContains(needle) => {
                let needle = needle.to_lowercase();
                turns
                    .iter()
                    .any(|t| t.character_output().to_lowercase().contains(&needle))
            }
            Self::Any(conditions) => conditions.iter().any(|c| c.holds(turns)),
            Self::All(conditions) => {
                !conditions.is_empty() && conditions.iter().all(|c| c.holds(turns))
            }
        }
    }

    /// Index of the first turn after which the condition held, if any.
    #[must_use]
    pub fn first_satisfied_at<T: TurnFacts>(&self, turns: &[T]) -> Option<u64> {
        (1..=turns.len())
            .find(|&len| self.holds(&turns[..len]))
            .map(|len| turns[len - 1].turn_index())
    }

    /// Checks the condition is well-formed, returning a description of the
    /// first problem found.
    pub(crate) fn check(&self) -> Result<(), String> {
        match self {
            Self::AfterTurn(_) => Ok(()),
            Self::ActionContains(needle) | Self::ResponseContains(needle) => {
                if needle.trim().is_empty() {
                    Err("text condition must not be empty".to_owned())
                } else {
                    Ok(())
                }
            }
            Self::Any(conditions) | Self::All(conditions) => {
                if conditions.is_empty() {
                    return Err("any/all condition must list at least one condition".to_owned());
                }
                conditions.iter().try_for_each(Condition::check)
            }
        }
    }
}
