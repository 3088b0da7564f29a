//! The Goal-Inference Scorer.
//!
//! Each hypothesis is graded against the participant view as it stood when
//! the hypothesis was declared. A hypothesis declared once its goal was
//! already visible to the participant earns nothing, so no score can rest
//! on information the participant was simply shown.

use std::collections::BTreeMap;

use parley_core::error::EngineError;
use parley_scenario::domain::config::ScenarioConfig;
use parley_scenario::domain::goal::GoalDefinition;
use parley_scenario::domain::rubric::{AggregateRule, CreditPolicy, RubricSpec};
use parley_scenario::domain::visibility::RuleTarget;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::{Hypothesis, SessionState, TerminationReason};
use super::visibility::{ParticipantView, is_visible_at, participant_view_at, revealed_at_turn};

/// A pluggable scoring rubric.
pub trait Rubric: Send + Sync {
    /// Grades one hypothesis against one goal, in `[0, 1]`. `view` is what
    /// the participant could see when the hypothesis was declared.
    fn grade(&self, goal: &GoalDefinition, hypothesis: &Hypothesis, view: &ParticipantView)
    -> f64;

    /// Whether a grade counts as a correct inference.
    fn is_match(&self, goal: &GoalDefinition, grade: f64) -> bool {
        grade >= goal.matcher.threshold
    }

    /// Which hypotheses earn credit.
    fn credit_policy(&self) -> CreditPolicy;

    /// Combines per-goal results into one comparable number.
    fn aggregate(&self, goals: &[GoalScore], turns_played: u64) -> f64;
}

/// The rubric described by a scenario's `rubric` section.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfiguredRubric {
    spec: RubricSpec,
}

impl ConfiguredRubric {
    /// Creates a rubric from explicit settings.
    #[must_use]
    pub fn new(spec: RubricSpec) -> Self {
        Self { spec }
    }

    /// Creates the rubric a scenario asks for.
    #[must_use]
    pub fn from_scenario(config: &ScenarioConfig) -> Self {
        Self::new(config.rubric)
    }
}

impl Rubric for ConfiguredRubric {
    fn grade(
        &self,
        goal: &GoalDefinition,
        hypothesis: &Hypothesis,
        _view: &ParticipantView,
    ) -> f64 {
        goal.matcher.grade(&hypothesis.text)
    }

    fn credit_policy(&self) -> CreditPolicy {
        self.spec.credit
    }

    #[allow(clippy::cast_precision_loss)]
    fn aggregate(&self, goals: &[GoalScore], _turns_played: u64) -> f64 {
        if goals.is_empty() {
            return 0.0;
        }
        let total_weight: f64 = goals.iter().map(|g| g.weight).sum();
        match self.spec.aggregate {
            AggregateRule::FractionCorrect => {
                goals.iter().filter(|g| g.matched).count() as f64 / goals.len() as f64
            }
            AggregateRule::Weighted => {
                goals.iter().map(|g| g.weight * g.grade).sum::<f64>() / total_weight
            }
            AggregateRule::SpeedWeighted { decay } => {
                goals
                    .iter()
                    .filter(|g| g.matched)
                    .filter_map(|g| g.first_correct_turn.map(|t| (g.weight, t)))
                    .map(|(weight, turn)| {
                        weight * (1.0 - decay).powi(i32::try_from(turn).unwrap_or(i32::MAX))
                    })
                    .sum::<f64>()
                    / total_weight
            }
        }
    }
}

/// Scoring breakdown for one goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalScore {
    /// Goal id.
    pub goal_id: String,
    /// Goal weight.
    pub weight: f64,
    /// Grade of the credited hypothesis (0 when none).
    pub grade: f64,
    /// Whether the credited hypothesis is a correct inference.
    pub matched: bool,
    /// Whether the hypothesis under consideration was declared after the
    /// goal was revealed, and so earned nothing.
    pub informed: bool,
    /// Declaration turn of the credited hypothesis.
    pub hypothesis_turn: Option<u64>,
    /// Declaration turn of the earliest eligible correct hypothesis, when
    /// the goal is matched.
    pub first_correct_turn: Option<u64>,
    /// Turns observed when the goal became visible, if it ever did.
    pub revealed_at_turn: Option<u64>,
}

/// The outcome of scoring a terminated session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Session identifier.
    pub session_id: Uuid,
    /// Scenario identifier.
    pub scenario_id: String,
    /// Character whose goals were scored.
    pub character_id: String,
    /// Per-goal breakdown in authoring order.
    pub goals: Vec<GoalScore>,
    /// Aggregate metric.
    pub aggregate: f64,
    /// Turns played.
    pub turns_played: u64,
    /// Hypotheses the participant declared.
    pub hypotheses_considered: usize,
    /// Why the session ended.
    pub termination: Option<TerminationReason>,
}

impl ScoreResult {
    /// Goal ids keyed by the turn of their first correct inference.
    #[must_use]
    pub fn by_first_correct_turn(&self) -> BTreeMap<u64, Vec<&str>> {
        let mut out: BTreeMap<u64, Vec<&str>> = BTreeMap::new();
        for goal in &self.goals {
            if let Some(turn) = goal.first_correct_turn {
                out.entry(turn).or_default().push(&goal.goal_id);
            }
        }
        out
    }
}

struct Graded<'a> {
    hypothesis: &'a Hypothesis,
    eligible: bool,
    grade: f64,
}

fn score_goal(session: &SessionState, goal: &GoalDefinition, rubric: &dyn Rubric) -> GoalScore {
    let target = RuleTarget::Goal(goal.id.clone());
    let graded: Vec<Graded<'_>> = session
        .hypotheses()
        .iter()
        .map(|hypothesis| {
            let eligible = !is_visible_at(session, &target, hypothesis.declared_at_turn);
            let grade = if eligible {
                let view = participant_view_at(session, hypothesis.declared_at_turn);
                rubric.grade(goal, hypothesis, &view).clamp(0.0, 1.0)
            } else {
                0.0
            };
            Graded {
                hypothesis,
                eligible,
                grade,
            }
        })
        .collect();

    let credited = match rubric.credit_policy() {
        CreditPolicy::LatestOnly => graded.last(),
        CreditPolicy::Cumulative => graded
            .iter()
            .filter(|g| g.eligible)
            .fold(None, |best: Option<&Graded<'_>>, g| match best {
                Some(b) if b.grade >= g.grade => Some(b),
                _ => Some(g),
            })
            .or(graded.last()),
    };

    let (grade, eligible, hypothesis_turn) = credited.map_or((0.0, false, None), |g| {
        (g.grade, g.eligible, Some(g.hypothesis.declared_at_turn))
    });
    let matched = eligible && rubric.is_match(goal, grade);
    let first_correct_turn = if matched {
        graded
            .iter()
            .find(|g| g.eligible && rubric.is_match(goal, g.grade))
            .map(|g| g.hypothesis.declared_at_turn)
    } else {
        None
    };

    GoalScore {
        goal_id: goal.id.clone(),
        weight: goal.weight,
        grade,
        matched,
        informed: credited.is_some() && !eligible,
        hypothesis_turn,
        first_correct_turn,
        revealed_at_turn: revealed_at_turn(session, &target),
    }
}

/// Scores a terminated session.
///
/// # Errors
///
/// Returns `EngineError::SessionNotComplete` unless the session has
/// terminated.
pub fn score(session: &SessionState, rubric: &dyn Rubric) -> Result<ScoreResult, EngineError> {
    if !session.is_terminated() {
        return Err(EngineError::SessionNotComplete(session.id()));
    }
    let goals: Vec<GoalScore> = session
        .scenario()
        .goals_for(&session.character().id)
        .map(|goal| score_goal(session, goal, rubric))
        .collect();
    let aggregate = rubric.aggregate(&goals, session.turn_count());

    Ok(ScoreResult {
        session_id: session.id(),
        scenario_id: session.scenario().id.clone(),
        character_id: session.character().id.clone(),
        goals,
        aggregate,
        turns_played: session.turn_count(),
        hypotheses_considered: session.hypotheses().len(),
        termination: session.termination(),
    })
}
