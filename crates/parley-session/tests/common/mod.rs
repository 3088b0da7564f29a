//! Helpers shared by the session integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use parley_core::clock::Clock;
use parley_core::repository::SessionRepository;
use parley_scenario::application::registry::ScenarioRegistry;
use parley_session::application::generator::CharacterGenerator;
use parley_session::application::lifecycle::{ManagerSettings, SessionManager};
use parley_session::domain::commands::{
    DeclareHypothesis, EndSession, ResumeSession, StartSession, SubmitAction, SuspendSession,
};
use parley_session::domain::state::SessionState;
use parley_test_support::fixtures::{SAMPLE_SCENARIO_ID, sample_registry, start_time};
use parley_test_support::{FixedClock, MockRng};
use uuid::Uuid;

/// A fresh blob session bound to the registered sample scenario.
pub fn blob_session(registry: &ScenarioRegistry) -> SessionState {
    let registered = registry.get(SAMPLE_SCENARIO_ID).unwrap();
    SessionState::create(
        Uuid::new_v4(),
        Arc::clone(&registered.config),
        registered.fingerprint.clone(),
        "blob",
        start_time(),
    )
    .unwrap()
}

/// A manager over the sample registry with a fixed clock.
pub fn manager(
    generator: Arc<dyn CharacterGenerator>,
    repository: Arc<dyn SessionRepository>,
) -> SessionManager {
    manager_with(
        sample_registry(),
        generator,
        repository,
        Arc::new(FixedClock(start_time())),
        ManagerSettings::default(),
    )
}

/// A manager with every collaborator chosen by the caller.
pub fn manager_with(
    registry: Arc<ScenarioRegistry>,
    generator: Arc<dyn CharacterGenerator>,
    repository: Arc<dyn SessionRepository>,
    clock: Arc<dyn Clock>,
    settings: ManagerSettings,
) -> SessionManager {
    SessionManager::new(
        registry,
        repository,
        generator,
        clock,
        Box::new(MockRng),
        settings,
    )
}

pub fn start(character: &str) -> StartSession {
    StartSession {
        correlation_id: Uuid::new_v4(),
        scenario_id: SAMPLE_SCENARIO_ID.to_owned(),
        character_id: Some(character.to_owned()),
    }
}

pub fn act(session_id: Uuid, text: &str) -> SubmitAction {
    SubmitAction {
        correlation_id: Uuid::new_v4(),
        session_id,
        text: text.to_owned(),
    }
}

pub fn guess(session_id: Uuid, text: &str) -> DeclareHypothesis {
    DeclareHypothesis {
        correlation_id: Uuid::new_v4(),
        session_id,
        text: text.to_owned(),
    }
}

pub fn suspend(session_id: Uuid) -> SuspendSession {
    SuspendSession {
        correlation_id: Uuid::new_v4(),
        session_id,
    }
}

pub fn resume(session_id: Uuid) -> ResumeSession {
    ResumeSession {
        correlation_id: Uuid::new_v4(),
        session_id,
    }
}

pub fn end(session_id: Uuid) -> EndSession {
    EndSession {
        correlation_id: Uuid::new_v4(),
        session_id,
    }
}
