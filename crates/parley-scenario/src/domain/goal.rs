//! Ground-truth goals and the structured predicate used to score them.

use serde::{Deserialize, Serialize};

fn default_weight() -> f64 {
    1.0
}

fn default_threshold() -> f64 {
    1.0
}

/// A goal pursued by exactly one character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalDefinition {
    /// Unique identifier within the scenario.
    pub id: String,
    /// The character that pursues this goal.
    pub character_id: String,
    /// Human-readable description (ground truth).
    pub description: String,
    /// Predicate a hypothesis must satisfy to count as inferring this goal.
    #[serde(default)]
    pub matcher: GoalMatcher,
    /// Relative weight in weighted aggregates.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

/// Keyword predicate over a participant's hypothesis text.
///
/// Matching is case-insensitive substring containment. The grade is the
/// mean of the `all_of` hit ratio and the `any_of` hit indicator, counting
/// only the lists that are non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalMatcher {
    /// Keywords that must all appear.
    #[serde(default)]
    pub all_of: Vec<String>,
    /// Keywords of which at least one must appear.
    #[serde(default)]
    pub any_of: Vec<String>,
    /// Minimum grade that counts as a correct inference.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for GoalMatcher {
    fn default() -> Self {
        Self {
            all_of: Vec::new(),
            any_of: Vec::new(),
            threshold: default_threshold(),
        }
    }
}

impl GoalMatcher {
    /// Returns whether the matcher lists no keywords at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all_of.iter().all(|k| k.trim().is_empty())
            && self.any_of.iter().all(|k| k.trim().is_empty())
    }

    /// Grades `text` in `[0.0, 1.0]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn grade(&self, text: &str) -> f64 {
        let haystack = text.to_lowercase();
        let contains = |keyword: &String| {
            let keyword = keyword.trim().to_lowercase();
            !keyword.is_empty() && haystack.contains(&keyword)
        };

        let mut components = Vec::with_capacity(2);
        if !self.all_of.is_empty() {
            let hits = self.all_of.iter().filter(|k| contains(k)).count();
            components.push(hits as f64 / self.all_of.len() as f64);
        }
        if !self.any_of.is_empty() {
            components.push(if self.any_of.iter().any(contains) {
                1.0
            } else {
                0.0
            });
        }

        if components.is_empty() {
            return 0.0;
        }
        components.iter().sum::<f64>() / components.len() as f64
    }

    /// Returns whether a grade counts as a correct inference.
    #[must_use]
    pub fn is_match(&self, grade: f64) -> bool {
        grade >= self.threshold
    }
}
