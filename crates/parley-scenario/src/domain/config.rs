//! The scenario aggregate: an immutable, validated description of a game.

use std::collections::BTreeMap;

use parley_core::error::EngineError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::character::CharacterDefinition;
use super::goal::GoalDefinition;
use super::rubric::RubricSpec;
use super::trigger::StateTrigger;
use super::validation;
use super::visibility::{RuleTarget, VisibilityRule};

fn default_version() -> String {
    "1".to_owned()
}

/// Stopping conditions and input bounds for sessions of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionLimits {
    /// Maximum number of turns before the session terminates.
    pub max_turns: u64,
    /// Maximum wall-clock duration of a session, if bounded.
    pub max_duration_secs: Option<u64>,
    /// Maximum length of one participant action, in characters.
    pub max_action_chars: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_turns: 500,
            max_duration_secs: Some(3600),
            max_action_chars: 350,
        }
    }
}

/// How the character generator is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Per-attempt timeout.
    pub timeout_ms: u64,
    /// Most recent turns forwarded as context.
    pub history_window: usize,
    /// Optional character budget for the forwarded history.
    pub max_context_chars: Option<usize>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            history_window: 20,
            max_context_chars: None,
        }
    }
}

/// A complete scenario definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Registry key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Author-controlled version label.
    #[serde(default = "default_version")]
    pub version: String,
    /// Characters on offer, in authoring order.
    pub characters: Vec<CharacterDefinition>,
    /// Ground-truth goals of all characters.
    #[serde(default)]
    pub goals: Vec<GoalDefinition>,
    /// Disclosure rules.
    #[serde(default)]
    pub visibility: Vec<VisibilityRule>,
    /// World-state triggers.
    #[serde(default)]
    pub triggers: Vec<StateTrigger>,
    /// Initial world state.
    #[serde(default)]
    pub world: BTreeMap<String, String>,
    /// Scenario rules forwarded to the generator.
    #[serde(default)]
    pub instructions: String,
    /// Scoring rubric.
    #[serde(default)]
    pub rubric: RubricSpec,
    /// Session limits.
    #[serde(default)]
    pub limits: SessionLimits,
    /// Generator call settings.
    #[serde(default)]
    pub generator: GeneratorSettings,
}

impl ScenarioConfig {
    /// Looks up a character by id.
    #[must_use]
    pub fn character(&self, id: &str) -> Option<&CharacterDefinition> {
        self.characters.iter().find(|c| c.id == id)
    }

    /// Looks up a goal by id.
    #[must_use]
    pub fn goal(&self, id: &str) -> Option<&GoalDefinition> {
        self.goals.iter().find(|g| g.id == id)
    }

    /// Goals pursued by `character_id`, in authoring order.
    pub fn goals_for<'a>(
        &'a self,
        character_id: &'a str,
    ) -> impl Iterator<Item = &'a GoalDefinition> + 'a {
        self.goals.iter().filter(move |g| g.character_id == character_id)
    }

    /// Triggers that can fire for `character_id`.
    pub fn triggers_for<'a>(
        &'a self,
        character_id: &'a str,
    ) -> impl Iterator<Item = &'a StateTrigger> + 'a {
        self.triggers
            .iter()
            .filter(move |t| t.applies_to(character_id))
    }

    /// The rule governing `target` of `character_id`, if any.
    #[must_use]
    pub fn rule_for(&self, character_id: &str, target: &RuleTarget) -> Option<&VisibilityRule> {
        self.visibility
            .iter()
            .find(|r| r.character_id == character_id && &r.target == target)
    }

    /// Checks every structural invariant, reporting all violations at once.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` listing each violation.
    pub fn validate(&self) -> Result<(), EngineError> {
        let problems = validation::problems(self);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Configuration(format!(
                "scenario '{}' is invalid: {}",
                self.id,
                problems.join("; ")
            )))
        }
    }

    /// SHA-256 of the canonical JSON form, hex encoded.
    ///
    /// Sessions record the fingerprint so a resumed session can never be
    /// re-bound to an edited scenario.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if the scenario cannot be
    /// serialized.
    pub fn fingerprint(&self) -> Result<String, EngineError> {
        let bytes = serde_json::to_vec(self).map_err(|e| {
            EngineError::Configuration(format!("cannot serialize scenario '{}': {e}", self.id))
        })?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }
}
