//! World-state triggers: scenario rules that mutate state once a condition
//! first holds.

use serde::{Deserialize, Serialize};

use super::condition::Condition;

/// A single state mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// Set a world-state key.
    SetWorld {
        /// World-state key.
        key: String,
        /// New value.
        value: String,
    },
    /// Set the bound character's attribute.
    SetAttribute {
        /// Attribute name.
        name: String,
        /// New value.
        value: String,
    },
}

/// Fires its effects at most once per session, on the first turn whose
/// history satisfies `when`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTrigger {
    /// Unique identifier within the scenario.
    pub id: String,
    /// Restricts the trigger to sessions bound to this character.
    #[serde(default)]
    pub character_id: Option<String>,
    /// Firing condition.
    pub when: Condition,
    /// Effects applied when the trigger fires.
    pub effects: Vec<Effect>,
}

impl StateTrigger {
    /// Whether the trigger can fire in a session bound to `character_id`.
    #[must_use]
    pub fn applies_to(&self, character_id: &str) -> bool {
        self.character_id
            .as_deref()
            .is_none_or(|id| id == character_id)
    }
}
