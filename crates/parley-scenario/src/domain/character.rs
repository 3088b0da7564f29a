//! Character definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Behavioral profile handed verbatim to the character generator.
///
/// The engine never interprets these fields; they describe how the
/// character senses, perceives, regulates and acts so the generator can
/// role-play it faithfully.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehavioralProfile {
    /// One-line description of the character.
    pub short_description: String,
    /// Full description of the character.
    pub long_description: String,
    /// Sensory modalities (e.g. "touch", "chemoreception").
    pub sensory: Vec<String>,
    /// Perceptual abilities.
    pub perceptual: Vec<String>,
    /// Regulatory/affective variables.
    pub regulatory: Vec<String>,
    /// Actions the character can take.
    pub action: Vec<String>,
    /// Any further authoring data.
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A character a participant can interact with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterDefinition {
    /// Unique identifier within the scenario.
    pub id: String,
    /// Name used in logs and authoring tools.
    pub display_name: String,
    /// Opaque behavioral profile.
    #[serde(default)]
    pub profile: BehavioralProfile,
    /// Named attributes whose disclosure is governed by visibility rules.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl CharacterDefinition {
    /// Returns whether the character declares an attribute called `name`.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }
}
