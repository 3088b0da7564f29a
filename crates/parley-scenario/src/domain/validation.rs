//! Structural checks behind `ScenarioConfig::validate`.

use std::collections::HashSet;

use super::config::ScenarioConfig;
use super::rubric::AggregateRule;
use super::trigger::Effect;
use super::visibility::RuleTarget;

/// Returns every violation found in `config`, in a stable order.
pub(crate) fn problems(config: &ScenarioConfig) -> Vec<String> {
    let mut out = Vec::new();

    if config.id.trim().is_empty() {
        out.push("scenario id must not be empty".to_owned());
    }
    check_characters(config, &mut out);
    check_goals(config, &mut out);
    check_visibility(config, &mut out);
    check_triggers(config, &mut out);
    check_settings(config, &mut out);

    out
}

fn check_characters(config: &ScenarioConfig, out: &mut Vec<String>) {
    if config.characters.is_empty() {
        out.push("scenario must define at least one character".to_owned());
    }
    let mut seen = HashSet::new();
    for character in &config.characters {
        if character.id.trim().is_empty() {
            out.push("character id must not be empty".to_owned());
        } else if !seen.insert(character.id.as_str()) {
            out.push(format!("duplicate character id '{}'", character.id));
        }
    }
}

fn check_goals(config: &ScenarioConfig, out: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for goal in &config.goals {
        if goal.id.trim().is_empty() {
            out.push("goal id must not be empty".to_owned());
        } else if !seen.insert(goal.id.as_str()) {
            out.push(format!("duplicate goal id '{}'", goal.id));
        }
        if config.character(&goal.character_id).is_none() {
            out.push(format!(
                "goal '{}' references unknown character '{}'",
                goal.id, goal.character_id
            ));
        }
        if goal.matcher.is_empty() {
            out.push(format!("goal '{}' has an empty matcher", goal.id));
        }
        let threshold = goal.matcher.threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            out.push(format!(
                "goal '{}' threshold {threshold} must be in (0, 1]",
                goal.id
            ));
        }
        if !(goal.weight.is_finite() && goal.weight > 0.0) {
            out.push(format!(
                "goal '{}' weight {} must be positive",
                goal.id, goal.weight
            ));
        }
    }
}

fn check_visibility(config: &ScenarioConfig, out: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for rule in &config.visibility {
        let Some(character) = config.character(&rule.character_id) else {
            out.push(format!(
                "visibility rule for {} references unknown character '{}'",
                rule.target, rule.character_id
            ));
            continue;
        };
        let exists = match &rule.target {
            RuleTarget::Attribute(name) => character.has_attribute(name),
            RuleTarget::Goal(id) => config
                .goal(id)
                .is_some_and(|g| g.character_id == character.id),
        };
        if !exists {
            out.push(format!(
                "visibility rule references {} which character '{}' does not have",
                rule.target, character.id
            ));
        }
        if !seen.insert((rule.character_id.as_str(), &rule.target)) {
            out.push(format!(
                "duplicate visibility rule for {} of character '{}'",
                rule.target, rule.character_id
            ));
        }
        if let Some(condition) = rule.condition()
            && let Err(reason) = condition.check()
        {
            out.push(format!("visibility rule for {}: {reason}", rule.target));
        }
    }
}

fn check_triggers(config: &ScenarioConfig, out: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for trigger in &config.triggers {
        if trigger.id.trim().is_empty() {
            out.push("trigger id must not be empty".to_owned());
        } else if !seen.insert(trigger.id.as_str()) {
            out.push(format!("duplicate trigger id '{}'", trigger.id));
        }
        if let Some(character_id) = &trigger.character_id
            && config.character(character_id).is_none()
        {
            out.push(format!(
                "trigger '{}' references unknown character '{character_id}'",
                trigger.id
            ));
        }
        if let Err(reason) = trigger.when.check() {
            out.push(format!("trigger '{}': {reason}", trigger.id));
        }
        if trigger.effects.is_empty() {
            out.push(format!("trigger '{}' has no effects", trigger.id));
        }
        for effect in &trigger.effects {
            match effect {
                Effect::SetWorld { key, .. } if key.trim().is_empty() => {
                    out.push(format!("trigger '{}' sets an empty world key", trigger.id));
                }
                Effect::SetAttribute { name, .. } => {
                    let missing = config
                        .characters
                        .iter()
                        .filter(|c| trigger.applies_to(&c.id))
                        .any(|c| !c.has_attribute(name));
                    if missing {
                        out.push(format!(
                            "trigger '{}' sets attribute '{name}' missing from a character it applies to",
                            trigger.id
                        ));
                    }
                }
                Effect::SetWorld { .. } => {}
            }
        }
    }
}

fn check_settings(config: &ScenarioConfig, out: &mut Vec<String>) {
    let limits = &config.limits;
    if limits.max_turns == 0 {
        out.push("limits.max_turns must be positive".to_owned());
    }
    if limits.max_duration_secs == Some(0) {
        out.push("limits.max_duration_secs must be positive".to_owned());
    }
    if limits.max_action_chars == 0 {
        out.push("limits.max_action_chars must be positive".to_owned());
    }

    let generator = &config.generator;
    if generator.timeout_ms == 0 {
        out.push("generator.timeout_ms must be positive".to_owned());
    }
    if generator.history_window == 0 {
        out.push("generator.history_window must be positive".to_owned());
    }
    if generator.max_context_chars == Some(0) {
        out.push("generator.max_context_chars must be positive".to_owned());
    }

    if let AggregateRule::SpeedWeighted { decay } = config.rubric.aggregate
        && !(0.0..1.0).contains(&decay)
    {
        out.push(format!("rubric decay {decay} must be in [0, 1)"));
    }
}
