//! The Turn Orchestrator: the per-turn state machine.
//!
//! `AwaitingParticipantAction -> GeneratingCharacterResponse ->
//! UpdatingState -> Delivered -> AwaitingParticipantAction`, or
//! `Terminated` once a limit is hit or the participant ends the session.
//! The generator call is the only suspension point. Until it succeeds the
//! session is untouched apart from its phase, which a drop guard restores
//! on failure or cancellation.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use parley_core::clock::Clock;
use parley_core::error::EngineError;
use tracing::{debug, error, info, warn};

use super::generator::CharacterGenerator;
use crate::domain::action::ParticipantAction;
use crate::domain::context::{GeneratorContext, filter_for_character_generator};
use crate::domain::observable::{ActionOutcome, sanitize_output};
use crate::domain::state::{
    AppliedEffect, SessionState, SessionStatus, TerminationReason, TurnPhase, TurnRecord,
};
use crate::domain::visibility::filter_for_participant;

/// Generator attempts per turn: the first call plus one retry.
const MAX_GENERATOR_ATTEMPTS: u32 = 2;

/// Generator calls slower than this are logged.
const SLOW_GENERATOR_CALL: Duration = Duration::from_secs(15);

/// Serialized contexts larger than this are logged.
const LARGE_CONTEXT_BYTES: usize = 50 * 1024;

/// Restores `AwaitingParticipantAction` unless the turn completed.
struct GenerationGuard<'a> {
    session: &'a mut SessionState,
    armed: bool,
}

impl<'a> GenerationGuard<'a> {
    fn arm(session: &'a mut SessionState) -> Self {
        session.set_phase(TurnPhase::GeneratingCharacterResponse);
        Self {
            session,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Deref for GenerationGuard<'_> {
    type Target = SessionState;

    fn deref(&self) -> &SessionState {
        self.session
    }
}

impl DerefMut for GenerationGuard<'_> {
    fn deref_mut(&mut self) -> &mut SessionState {
        self.session
    }
}

impl Drop for GenerationGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.session.set_phase(TurnPhase::AwaitingParticipantAction);
        }
    }
}

/// Drives turns of one session at a time. Callers serialize access to each
/// session; the orchestrator itself holds no per-session state.
pub struct TurnOrchestrator {
    generator: Arc<dyn CharacterGenerator>,
    clock: Arc<dyn Clock>,
}

impl TurnOrchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(generator: Arc<dyn CharacterGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self { generator, clock }
    }

    /// Handles one line of participant input.
    ///
    /// # Errors
    ///
    /// - `SessionTerminated` if the session has ended.
    /// - `InvalidSessionState` if the session is suspended, unusable, or not
    ///   awaiting an action.
    /// - `InvalidAction` if the text is empty or too long.
    /// - `TurnFailed` if the generator failed; the session is unchanged.
    /// - `InvalidTurnSequence` if the history invariant broke; the session
    ///   is flagged unusable.
    pub async fn submit_action(
        &self,
        session: &mut SessionState,
        input: &str,
    ) -> Result<ActionOutcome, EngineError> {
        ensure_accepting(session)?;
        if let Some(reason) = self.enforce_time_limit(session) {
            return Ok(ActionOutcome::Ended { reason });
        }
        check_length(session, input)?;

        match ParticipantAction::parse(input) {
            ParticipantAction::EndSession => {
                self.terminate(session, TerminationReason::ParticipantEnded);
                Ok(ActionOutcome::Ended {
                    reason: TerminationReason::ParticipantEnded,
                })
            }
            ParticipantAction::Hypothesis(text) => {
                let declared_at_turn = self.record_hypothesis(session, &text)?;
                Ok(ActionOutcome::HypothesisRecorded { declared_at_turn })
            }
            ParticipantAction::Feedback(text) => {
                require_text(&text)?;
                session.record_feedback(text, self.clock.now());
                Ok(ActionOutcome::FeedbackRecorded)
            }
            ParticipantAction::Act(text) => {
                require_text(&text)?;
                self.run_turn(session, text).await
            }
        }
    }

    /// Records a goal hypothesis outside the `/guess` command path.
    ///
    /// # Errors
    ///
    /// Same state and length checks as [`Self::submit_action`].
    pub fn declare_hypothesis(
        &self,
        session: &mut SessionState,
        text: &str,
    ) -> Result<u64, EngineError> {
        ensure_accepting(session)?;
        check_length(session, text)?;
        self.record_hypothesis(session, text.trim())
    }

    /// Terminates the session. Returns `false` if it was already terminated.
    pub fn terminate(&self, session: &mut SessionState, reason: TerminationReason) -> bool {
        let changed = session.terminate(reason, self.clock.now());
        if changed {
            info!(
                session_id = %session.id(),
                ?reason,
                turns = session.turn_count(),
                "session terminated"
            );
        }
        changed
    }

    /// Terminates the session if it has outlived its duration limit.
    pub fn enforce_time_limit(&self, session: &mut SessionState) -> Option<TerminationReason> {
        let max = session.scenario().limits.max_duration_secs?;
        let elapsed = self.clock.seconds_since(session.started_at());
        if elapsed > i64::try_from(max).unwrap_or(i64::MAX) {
            self.terminate(session, TerminationReason::TimeLimitReached);
            return Some(TerminationReason::TimeLimitReached);
        }
        None
    }

    fn record_hypothesis(&self, session: &mut SessionState, text: &str) -> Result<u64, EngineError> {
        require_text(text)?;
        let hypothesis = session.record_hypothesis(text, self.clock.now());
        debug!(declared_at_turn = hypothesis.declared_at_turn, "hypothesis recorded");
        Ok(hypothesis.declared_at_turn)
    }

    async fn run_turn(
        &self,
        session: &mut SessionState,
        text: String,
    ) -> Result<ActionOutcome, EngineError> {
        let context = filter_for_character_generator(session, &text);
        let size = context.serialized_len();
        if size > LARGE_CONTEXT_BYTES {
            warn!(session_id = %session.id(), bytes = size, "large generator context");
        }
        let timeout_ms = session.scenario().generator.timeout_ms;

        let mut guard = GenerationGuard::arm(session);
        let raw = self.generate_with_retry(&context, timeout_ms).await?;

        guard.set_phase(TurnPhase::UpdatingState);
        let turn_index = guard.turn_count();
        let observable = sanitize_output(&raw);
        let pending = TurnRecord::new(turn_index, text, raw, observable, self.clock.now());
        let effects = fired_effects(&guard, &pending);
        let record = pending.with_effects(effects);
        let delivered = record.clone();

        if let Err(err) = guard.append_turn(record) {
            error!(session_id = %guard.id(), error = %err, "turn history invariant violated");
            guard.mark_unusable(err.to_string());
            return Err(err);
        }
        guard.disarm();
        guard.set_phase(TurnPhase::Delivered);

        if guard.turn_count() >= guard.scenario().limits.max_turns {
            self.terminate(&mut guard, TerminationReason::TurnLimitReached);
        } else {
            guard.set_phase(TurnPhase::AwaitingParticipantAction);
        }

        Ok(ActionOutcome::Step(filter_for_participant(&guard, &delivered)))
    }

    /// Calls the generator with a timeout, retrying once on retryable
    /// failures. The context is sent unchanged on the retry.
    async fn generate_with_retry(
        &self,
        context: &GeneratorContext,
        timeout_ms: u64,
    ) -> Result<String, EngineError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let started = tokio::time::Instant::now();
            let result = match tokio::time::timeout(
                Duration::from_millis(timeout_ms),
                self.generator.generate(context),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(EngineError::GeneratorTimeout { timeout_ms }),
            };
            let elapsed = started.elapsed();
            if elapsed > SLOW_GENERATOR_CALL {
                warn!(
                    session_id = %context.session_id,
                    elapsed_ms = elapsed.as_millis(),
                    "slow generator call"
                );
            }

            match result {
                Ok(text) => return Ok(text),
                Err(err) if err.is_retryable() && attempts < MAX_GENERATOR_ATTEMPTS => {
                    warn!(
                        session_id = %context.session_id,
                        attempt = attempts,
                        error = %err,
                        "generator call failed, retrying"
                    );
                }
                Err(err) => {
                    return Err(EngineError::TurnFailed {
                        session_id: context.session_id,
                        attempts,
                        last_error: Box::new(err),
                    });
                }
            }
        }
    }
}

/// Effects of every applicable trigger that has not fired yet and whose
/// condition holds once `pending` is added to the history.
fn fired_effects(session: &SessionState, pending: &TurnRecord) -> Vec<AppliedEffect> {
    let fired = session.fired_triggers();
    let turns: Vec<&TurnRecord> = session.history().iter().chain([pending]).collect();
    session
        .scenario()
        .triggers_for(&session.character().id)
        .filter(|trigger| !fired.contains(trigger.id.as_str()))
        .filter(|trigger| trigger.when.holds(&turns))
        .flat_map(|trigger| {
            debug!(trigger_id = %trigger.id, turn_index = pending.turn_index(), "trigger fired");
            trigger.effects.iter().map(|effect| AppliedEffect {
                trigger_id: trigger.id.clone(),
                effect: effect.clone(),
            })
        })
        .collect()
}

fn ensure_accepting(session: &SessionState) -> Result<(), EngineError> {
    if let Some(reason) = session.unusable_reason() {
        return Err(EngineError::InvalidSessionState {
            session_id: session.id(),
            reason: format!("session is flagged unusable: {reason}"),
        });
    }
    match session.status() {
        SessionStatus::Terminated => return Err(EngineError::SessionTerminated(session.id())),
        SessionStatus::Suspended => {
            return Err(EngineError::InvalidSessionState {
                session_id: session.id(),
                reason: "session is suspended".to_owned(),
            });
        }
        SessionStatus::Active => {}
    }
    if session.phase() != TurnPhase::AwaitingParticipantAction {
        return Err(EngineError::InvalidSessionState {
            session_id: session.id(),
            reason: format!("a turn is already in progress ({:?})", session.phase()),
        });
    }
    Ok(())
}

fn check_length(session: &SessionState, input: &str) -> Result<(), EngineError> {
    let max = session.scenario().limits.max_action_chars;
    let len = input.trim().chars().count();
    if len > max {
        return Err(EngineError::InvalidAction(format!(
            "input is {len} characters, the limit is {max}"
        )));
    }
    Ok(())
}

fn require_text(text: &str) -> Result<(), EngineError> {
    if text.trim().is_empty() {
        return Err(EngineError::InvalidAction("input must not be empty".to_owned()));
    }
    Ok(())
}
