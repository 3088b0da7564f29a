//! Turn orchestrator behaviour against scripted generators.

mod common;

use std::sync::Arc;
use std::time::Duration;

use parley_core::error::EngineError;
use parley_session::application::generator::CharacterGenerator;
use parley_session::application::orchestrator::TurnOrchestrator;
use parley_session::domain::observable::{ActionOutcome, ObservableStep};
use parley_session::domain::state::{SessionStatus, TerminationReason, TurnPhase};
use parley_test_support::fixtures::{sample_registry, start_time};
use parley_test_support::{
    FailingGenerator, FixedClock, ManualClock, ScriptedGenerator, SlowGenerator,
};

use common::blob_session;

fn orchestrator(generator: Arc<dyn CharacterGenerator>) -> TurnOrchestrator {
    TurnOrchestrator::new(generator, Arc::new(FixedClock(start_time())))
}

fn expect_step(outcome: ActionOutcome) -> ObservableStep {
    match outcome {
        ActionOutcome::Step(step) => step,
        other => panic!("expected a step, got {other:?}"),
    }
}

#[tokio::test]
async fn test_submit_action_records_turn_and_returns_step() {
    // Arrange
    let registry = sample_registry();
    let mut session = blob_session(&registry);
    let generator = Arc::new(ScriptedGenerator::replying("It drifts toward you."));
    let orchestrator = orchestrator(generator.clone());

    // Act
    let step = expect_step(
        orchestrator
            .submit_action(&mut session, "I wave at it")
            .await
            .unwrap(),
    );

    // Assert
    assert_eq!(step.turn_index, 0);
    assert_eq!(step.output, "It drifts toward you.");
    assert_eq!(step.attributes.get("mood").map(String::as_str), Some("curious"));
    assert!(!step.attributes.contains_key("diet"));
    assert_eq!(step.turns_remaining, 4);
    assert_eq!(session.turn_count(), 1);
    assert_eq!(session.phase(), TurnPhase::AwaitingParticipantAction);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_turn_indices_are_gap_free_across_turns() {
    let registry = sample_registry();
    let mut session = blob_session(&registry);
    let orchestrator = orchestrator(Arc::new(ScriptedGenerator::replying("It waits.")));

    for action in ["wave", "wait", "hum", "watch"] {
        orchestrator.submit_action(&mut session, action).await.unwrap();
    }

    let indices: Vec<u64> = session.history().iter().map(|t| t.turn_index()).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_generator_failing_twice_leaves_session_unchanged() {
    // Arrange
    let registry = sample_registry();
    let mut session = blob_session(&registry);
    let generator = Arc::new(FailingGenerator::unavailable());
    let orchestrator = orchestrator(generator.clone());
    let before = session.summary();

    // Act
    let result = orchestrator.submit_action(&mut session, "I wave").await;

    // Assert
    assert!(matches!(
        result,
        Err(EngineError::TurnFailed { attempts: 2, .. })
    ));
    assert_eq!(generator.calls(), 2);
    assert_eq!(session.summary(), before);
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_failed_turn_can_be_retried_with_the_same_action() {
    // Arrange
    let registry = sample_registry();
    let mut session = blob_session(&registry);
    let generator = Arc::new(ScriptedGenerator::new(vec![
        Err(EngineError::GeneratorUnavailable("down".into())),
        Err(EngineError::GeneratorUnavailable("down".into())),
        Ok("It glows.".into()),
    ]));
    let orchestrator = orchestrator(generator.clone());

    // Act
    let first = orchestrator.submit_action(&mut session, "I wave").await;
    let second = orchestrator.submit_action(&mut session, "I wave").await;

    // Assert
    assert!(first.is_err());
    assert_eq!(expect_step(second.unwrap()).turn_index, 0);
    assert_eq!(generator.calls(), 3);
}

#[tokio::test]
async fn test_retry_reuses_the_identical_context() {
    let registry = sample_registry();
    let mut session = blob_session(&registry);
    let generator = Arc::new(ScriptedGenerator::new(vec![
        Err(EngineError::GeneratorTimeout { timeout_ms: 200 }),
        Ok("It glows.".into()),
    ]));
    let orchestrator = orchestrator(generator.clone());

    let step = expect_step(orchestrator.submit_action(&mut session, "I wave").await.unwrap());

    let contexts = generator.contexts();
    assert_eq!(step.output, "It glows.");
    assert_eq!(contexts.len(), 2);
    assert_eq!(contexts[0], contexts[1]);
}

#[tokio::test]
async fn test_non_retryable_generator_error_is_not_retried() {
    let registry = sample_registry();
    let mut session = blob_session(&registry);
    let generator = Arc::new(FailingGenerator::non_retryable());
    let orchestrator = orchestrator(generator.clone());

    let result = orchestrator.submit_action(&mut session, "I wave").await;

    assert!(matches!(
        result,
        Err(EngineError::TurnFailed { attempts: 1, .. })
    ));
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_generator_timeout_is_retried_then_reported() {
    // Arrange: the scenario allows 200 ms per attempt.
    let registry = sample_registry();
    let mut session = blob_session(&registry);
    let generator = Arc::new(SlowGenerator::new(Duration::from_secs(2), "late"));
    let orchestrator = orchestrator(generator.clone());

    // Act
    let result = orchestrator.submit_action(&mut session, "I wave").await;

    // Assert
    match result {
        Err(EngineError::TurnFailed {
            attempts,
            last_error,
            ..
        }) => {
            assert_eq!(attempts, 2);
            assert!(matches!(
                *last_error,
                EngineError::GeneratorTimeout { timeout_ms: 200 }
            ));
        }
        other => panic!("expected TurnFailed, got {other:?}"),
    }
    assert_eq!(generator.calls(), 2);
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_cancelled_turn_restores_the_phase() {
    // Arrange
    let registry = sample_registry();
    let mut session = blob_session(&registry);
    let orchestrator = orchestrator(Arc::new(SlowGenerator::new(
        Duration::from_secs(2),
        "late",
    )));

    // Act
    let cancelled = tokio::time::timeout(
        Duration::from_millis(50),
        orchestrator.submit_action(&mut session, "I wave"),
    )
    .await;

    // Assert
    assert!(cancelled.is_err());
    assert_eq!(session.phase(), TurnPhase::AwaitingParticipantAction);
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_submit_on_terminated_session_fails_and_keeps_history() {
    // Arrange
    let registry = sample_registry();
    let mut session = blob_session(&registry);
    let orchestrator = orchestrator(Arc::new(ScriptedGenerator::replying("ok")));
    orchestrator.submit_action(&mut session, "wave").await.unwrap();
    orchestrator.terminate(&mut session, TerminationReason::Forced);

    // Act
    let result = orchestrator.submit_action(&mut session, "wave again").await;

    // Assert
    assert!(matches!(result, Err(EngineError::SessionTerminated(_))));
    assert_eq!(session.turn_count(), 1);
}

#[tokio::test]
async fn test_quit_command_ends_the_session() {
    let registry = sample_registry();
    let mut session = blob_session(&registry);
    let generator = Arc::new(ScriptedGenerator::replying("ok"));
    let orchestrator = orchestrator(generator.clone());

    let outcome = orchestrator.submit_action(&mut session, "/quit").await.unwrap();

    assert_eq!(
        outcome,
        ActionOutcome::Ended {
            reason: TerminationReason::ParticipantEnded
        }
    );
    assert_eq!(session.status(), SessionStatus::Terminated);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_guess_and_feedback_commands_do_not_create_turns() {
    // Arrange
    let registry = sample_registry();
    let mut session = blob_session(&registry);
    let generator = Arc::new(ScriptedGenerator::replying("ok"));
    let orchestrator = orchestrator(generator.clone());

    // Act
    let guessed = orchestrator
        .submit_action(&mut session, "/guess it wants the light")
        .await
        .unwrap();
    let noted = orchestrator
        .submit_action(&mut session, "/feedback fun so far")
        .await
        .unwrap();

    // Assert
    assert_eq!(
        guessed,
        ActionOutcome::HypothesisRecorded {
            declared_at_turn: 0
        }
    );
    assert_eq!(noted, ActionOutcome::FeedbackRecorded);
    assert_eq!(session.hypotheses()[0].text, "it wants the light");
    assert_eq!(session.feedback()[0].text, "fun so far");
    assert_eq!(session.turn_count(), 0);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_empty_and_overlong_input_is_rejected() {
    let registry = sample_registry();
    let mut session = blob_session(&registry);
    let generator = Arc::new(ScriptedGenerator::replying("ok"));
    let orchestrator = orchestrator(generator.clone());

    let empty = orchestrator.submit_action(&mut session, "   ").await;
    let empty_guess = orchestrator.submit_action(&mut session, "/guess").await;
    let long = orchestrator
        .submit_action(&mut session, &"a".repeat(121))
        .await;

    assert!(matches!(empty, Err(EngineError::InvalidAction(_))));
    assert!(matches!(empty_guess, Err(EngineError::InvalidAction(_))));
    assert!(matches!(long, Err(EngineError::InvalidAction(_))));
    assert_eq!(generator.calls(), 0);
    assert!(session.hypotheses().is_empty());
}

#[tokio::test]
async fn test_turn_limit_terminates_on_the_last_turn() {
    // Arrange: the sample scenario allows five turns.
    let registry = sample_registry();
    let mut session = blob_session(&registry);
    let orchestrator = orchestrator(Arc::new(ScriptedGenerator::replying("ok")));
    for action in ["one", "two", "three", "four"] {
        orchestrator.submit_action(&mut session, action).await.unwrap();
    }

    // Act
    let last = expect_step(orchestrator.submit_action(&mut session, "five").await.unwrap());
    let after = orchestrator.submit_action(&mut session, "six").await;

    // Assert
    assert_eq!(last.turn_index, 4);
    assert_eq!(last.turns_remaining, 0);
    assert_eq!(last.terminated, Some(TerminationReason::TurnLimitReached));
    assert!(matches!(after, Err(EngineError::SessionTerminated(_))));
    assert_eq!(session.turn_count(), 5);
}

#[tokio::test]
async fn test_time_limit_terminates_before_generating() {
    // Arrange
    let registry = sample_registry();
    let mut session = blob_session(&registry);
    let clock = Arc::new(ManualClock::new(start_time()));
    let generator = Arc::new(ScriptedGenerator::replying("ok"));
    let orchestrator = TurnOrchestrator::new(generator.clone(), clock.clone());
    clock.advance(chrono::Duration::seconds(601));

    // Act
    let outcome = orchestrator.submit_action(&mut session, "wave").await.unwrap();

    // Assert
    assert_eq!(
        outcome,
        ActionOutcome::Ended {
            reason: TerminationReason::TimeLimitReached
        }
    );
    assert_eq!(generator.calls(), 0);
    assert!(session.is_terminated());
}

#[tokio::test]
async fn test_trigger_fires_once_and_updates_world_and_attributes() {
    // Arrange
    let registry = sample_registry();
    let mut session = blob_session(&registry);
    let generator = Arc::new(ScriptedGenerator::replying("It brightens."));
    let orchestrator = orchestrator(generator.clone());

    // Act
    let step = expect_step(
        orchestrator
            .submit_action(&mut session, "I flip the switch")
            .await
            .unwrap(),
    );
    orchestrator
        .submit_action(&mut session, "I flip the switch again")
        .await
        .unwrap();

    // Assert
    assert_eq!(step.attributes.get("mood").map(String::as_str), Some("excited"));
    assert_eq!(session.history()[0].effects().len(), 2);
    assert!(session.history()[1].effects().is_empty());
    let second_context = &generator.contexts()[1];
    assert_eq!(second_context.world.get("lamp").map(String::as_str), Some("on"));
    assert_eq!(
        second_context.character_state.get("mood").map(String::as_str),
        Some("excited")
    );
}

#[tokio::test]
async fn test_generator_never_sees_hypotheses() {
    let registry = sample_registry();
    let mut session = blob_session(&registry);
    let generator = Arc::new(ScriptedGenerator::replying("ok"));
    let orchestrator = orchestrator(generator.clone());

    orchestrator
        .submit_action(&mut session, "/guess it secretly loves sunlight")
        .await
        .unwrap();
    orchestrator.submit_action(&mut session, "wave").await.unwrap();

    let json = serde_json::to_string(&generator.contexts()[0]).unwrap();
    assert!(!json.contains("secretly loves sunlight"));
    assert!(json.contains("phototroph"));
}

#[tokio::test]
async fn test_meta_content_is_hidden_from_participant_but_kept_raw() {
    let registry = sample_registry();
    let mut session = blob_session(&registry);
    let orchestrator = orchestrator(Arc::new(ScriptedGenerator::replying(
        "It contracts.<meta>it fears your hand</meta>",
    )));

    let step = expect_step(orchestrator.submit_action(&mut session, "reach in").await.unwrap());

    assert_eq!(step.output, "It contracts.");
    assert!(session.history()[0].raw_output().contains("fears your hand"));
}

#[tokio::test]
async fn test_declare_hypothesis_stamps_turns_observed() {
    let registry = sample_registry();
    let mut session = blob_session(&registry);
    let orchestrator = orchestrator(Arc::new(ScriptedGenerator::replying("ok")));
    orchestrator.submit_action(&mut session, "wave").await.unwrap();
    orchestrator.submit_action(&mut session, "wait").await.unwrap();

    let declared = orchestrator
        .declare_hypothesis(&mut session, "it avoids touch")
        .unwrap();

    assert_eq!(declared, 2);
}
