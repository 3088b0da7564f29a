//! Scenario-supplied scoring rubric settings.

use serde::{Deserialize, Serialize};

/// How per-goal results combine into the aggregate score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AggregateRule {
    /// Matched goals divided by total goals.
    #[default]
    FractionCorrect,
    /// Weighted mean of the credited grades.
    Weighted,
    /// Weighted mean of `(1 - decay)^first_correct_turn` over matched goals.
    SpeedWeighted {
        /// Per-turn decay in `[0, 1)`.
        decay: f64,
    },
}

/// Which hypotheses earn credit for a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CreditPolicy {
    /// Only the most recent hypothesis counts.
    #[default]
    LatestOnly,
    /// The best eligible hypothesis counts.
    Cumulative,
}

/// The `rubric` section of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RubricSpec {
    /// Aggregation rule.
    pub aggregate: AggregateRule,
    /// Credit policy.
    pub credit: CreditPolicy,
}
