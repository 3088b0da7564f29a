//! Participant-facing results of an action.

use std::collections::BTreeMap;

use parley_scenario::domain::visibility::RuleTarget;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::TerminationReason;
use super::visibility::RevealedGoal;

const META_OPEN: &str = "<meta>";
const META_CLOSE: &str = "</meta>";

/// The observable world step returned after a successful turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservableStep {
    /// Session identifier.
    pub session_id: Uuid,
    /// Index of the turn that produced this step.
    pub turn_index: u64,
    /// The character's sanitized output.
    pub output: String,
    /// Visible attributes after the turn.
    pub attributes: BTreeMap<String, String>,
    /// Goals revealed so far.
    pub revealed_goals: Vec<RevealedGoal>,
    /// Targets that became visible on this turn.
    pub newly_revealed: Vec<RuleTarget>,
    /// Turns left before the turn limit.
    pub turns_remaining: u64,
    /// Set when this turn ended the session.
    pub terminated: Option<TerminationReason>,
}

/// Result of `submit_action`.
///
/// A failed turn is an `Err`, never one of these, so a presentation layer
/// can tell "nothing happened" apart from "something went wrong".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// An in-world action produced a new turn.
    Step(ObservableStep),
    /// A `/guess` was recorded.
    HypothesisRecorded {
        /// Turns observed at declaration.
        declared_at_turn: u64,
    },
    /// A `/feedback` note was recorded.
    FeedbackRecorded,
    /// The session ended.
    Ended {
        /// Why it ended.
        reason: TerminationReason,
    },
}

/// Strips generator meta content from `raw` for display.
///
/// A JSON envelope `{"type": ..., "content": "..."}` is unwrapped to its
/// content. `<meta>...</meta>` segments are removed; an unclosed `<meta>`
/// hides everything after it.
#[must_use]
pub fn sanitize_output(raw: &str) -> String {
    let text = unwrap_envelope(raw.trim());
    strip_meta(&text).trim().to_owned()
}

fn unwrap_envelope(text: &str) -> String {
    if text.starts_with('{')
        && let Ok(serde_json::Value::Object(map)) = serde_json::from_str(text)
        && let Some(serde_json::Value::String(content)) = map.get("content")
    {
        return content.clone();
    }
    text.to_owned()
}

fn strip_meta(text: &str) -> String {
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let lower = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    while let Some(open) = lower[cursor..].find(META_OPEN) {
        let open = cursor + open;
        out.push_str(&text[cursor..open]);
        match lower[open..].find(META_CLOSE) {
            Some(close) => cursor = open + close + META_CLOSE.len(),
            None => return out,
        }
    }
    out.push_str(&text[cursor..]);
    out
}
