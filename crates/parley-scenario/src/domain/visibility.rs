//! Participant-facing disclosure rules.

use serde::{Deserialize, Serialize};

use super::condition::Condition;

/// How a target is disclosed to the participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Never shown to the participant.
    AlwaysHidden,
    /// Shown from the first turn onwards.
    AlwaysVisible,
    /// Shown once the condition holds over the recorded history.
    RevealedOn(Condition),
}

/// What a rule governs: a named character attribute or a goal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTarget {
    /// A key of `CharacterDefinition::attributes`.
    Attribute(String),
    /// A `GoalDefinition` id.
    Goal(String),
}

impl std::fmt::Display for RuleTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Attribute(name) => write!(f, "attribute '{name}'"),
            Self::Goal(id) => write!(f, "goal '{id}'"),
        }
    }
}

/// A disclosure rule for one target of one character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityRule {
    /// The character that owns the target.
    pub character_id: String,
    /// The governed attribute or goal.
    pub target: RuleTarget,
    /// The disclosure policy.
    pub visibility: Visibility,
}

impl VisibilityRule {
    /// The condition a `revealed_on` rule waits for.
    #[must_use]
    pub fn condition(&self) -> Option<&Condition> {
        match &self.visibility {
            Visibility::RevealedOn(condition) => Some(condition),
            Visibility::AlwaysHidden | Visibility::AlwaysVisible => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_deserializes_from_yaml() {
        // Arrange
        let yaml = r"
character_id: blob
target:
  goal: seek_light
visibility:
  revealed_on:
    after_turn: 2
";

        // Act
        let rule: VisibilityRule = crate::yaml::from_str(yaml).unwrap();

        // Assert
        assert_eq!(rule.target, RuleTarget::Goal("seek_light".into()));
        assert_eq!(rule.condition(), Some(&Condition::AfterTurn(2)));
    }

    #[test]
    fn test_unit_visibilities_deserialize_from_plain_strings() {
        let hidden: Visibility = crate::yaml::from_str("always_hidden").unwrap();
        let visible: Visibility = crate::yaml::from_str("always_visible").unwrap();

        assert_eq!(hidden, Visibility::AlwaysHidden);
        assert_eq!(visible, Visibility::AlwaysVisible);
    }

    #[test]
    fn test_target_display_names_the_kind() {
        assert_eq!(
            RuleTarget::Attribute("mood".into()).to_string(),
            "attribute 'mood'"
        );
        assert_eq!(RuleTarget::Goal("g1".into()).to_string(), "goal 'g1'");
    }
}
