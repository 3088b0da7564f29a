//! Scenario fixtures shared by the test suites.
//!
//! `tide-pool` has two characters. The blob's `mood` is always visible,
//! its `diet` always hidden, its `size` revealed once the participant
//! measures it, its `seek_light` goal revealed after turn 2 and its
//! `avoid_touch` goal never. Saying "switch" fires the `lamp_on` trigger.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use parley_scenario::application::registry::ScenarioRegistry;
use parley_scenario::domain::config::ScenarioConfig;

/// Id of the sample scenario.
pub const SAMPLE_SCENARIO_ID: &str = "tide-pool";

/// The sample scenario as authored.
pub const SAMPLE_SCENARIO_YAML: &str = r#"
id: tide-pool
name: Tide Pool
description: A small creature in a rock pool at low tide.
version: "1"
instructions: Respond only with what the character does. Never speak.
world:
  lamp: "off"
  tide: low
characters:
  - id: blob
    display_name: Blob
    profile:
      short_description: A translucent blob.
      long_description: A soft, translucent organism that drifts slowly.
      sensory: [light, vibration]
      perceptual: [brightness gradients]
      regulatory: [energy]
      action: [drift, contract, glow]
    attributes:
      mood: curious
      size: small
      diet: phototroph
  - id: crab
    display_name: Crab
    profile:
      short_description: A hermit crab.
      sensory: [touch, chemoreception]
      action: [scuttle, pinch, hide]
    attributes:
      mood: wary
      size: medium
      diet: scavenger
goals:
  - id: seek_light
    character_id: blob
    description: The blob wants to reach the light.
    weight: 2.0
    matcher:
      all_of: [light]
      any_of: [reach, find, seek, move]
  - id: avoid_touch
    character_id: blob
    description: The blob avoids being touched.
    matcher:
      any_of: [touch, contact]
  - id: find_shell
    character_id: crab
    description: The crab wants a bigger shell.
    matcher:
      all_of: [shell]
visibility:
  - character_id: blob
    target: {attribute: mood}
    visibility: always_visible
  - character_id: blob
    target: {attribute: diet}
    visibility: always_hidden
  - character_id: blob
    target: {attribute: size}
    visibility:
      revealed_on: {action_contains: measure}
  - character_id: blob
    target: {goal: seek_light}
    visibility:
      revealed_on: {after_turn: 2}
  - character_id: blob
    target: {goal: avoid_touch}
    visibility: always_hidden
  - character_id: crab
    target: {attribute: mood}
    visibility: always_visible
triggers:
  - id: lamp_on
    when: {action_contains: switch}
    effects:
      - set_world: {key: lamp, value: "on"}
      - set_attribute: {name: mood, value: excited}
limits:
  max_turns: 5
  max_duration_secs: 600
  max_action_chars: 120
generator:
  timeout_ms: 200
  history_window: 3
"#;

/// Parses the sample scenario.
///
/// # Panics
///
/// Panics if the embedded YAML is malformed.
#[must_use]
pub fn sample_scenario() -> ScenarioConfig {
    parley_scenario::yaml::from_str(SAMPLE_SCENARIO_YAML).expect("sample scenario YAML is valid")
}

/// A registry holding the sample scenario.
///
/// # Panics
///
/// Panics if the sample scenario fails validation.
#[must_use]
pub fn sample_registry() -> Arc<ScenarioRegistry> {
    registry_with(sample_scenario())
}

/// A registry holding `config`.
///
/// # Panics
///
/// Panics if `config` fails validation.
#[must_use]
pub fn registry_with(config: ScenarioConfig) -> Arc<ScenarioRegistry> {
    let mut registry = ScenarioRegistry::new();
    registry
        .register(config)
        .expect("fixture scenario is valid");
    Arc::new(registry)
}

/// The instant every fixture session starts at.
#[must_use]
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap()
}
