//! The Session Lifecycle Manager.
//!
//! Owns every live session behind its own `tokio::sync::Mutex`. A request
//! that finds the session's lock held is rejected rather than queued, so
//! turns of one session never interleave while other sessions run freely.
//! Store calls are bounded by `ManagerSettings::store_timeout`.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use parley_core::clock::Clock;
use parley_core::command::Command;
use parley_core::error::EngineError;
use parley_core::repository::{SessionRepository, StoredSession};
use parley_core::rng::DeterministicRng;
use parley_scenario::application::registry::ScenarioRegistry;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::generator::CharacterGenerator;
use super::orchestrator::TurnOrchestrator;
use super::persistence::{from_stored, to_stored};
use crate::domain::commands::{
    DeclareHypothesis, EndSession, ResumeSession, StartSession, SubmitAction, SuspendSession,
};
use crate::domain::observable::ActionOutcome;
use crate::domain::scoring::{ConfiguredRubric, Rubric, ScoreResult, score};
use crate::domain::state::{SessionState, SessionStatus, SessionSummary, TerminationReason};
use crate::domain::visibility::{ParticipantView, participant_view};

/// What happens to a terminated session's in-memory state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchivePolicy {
    /// Persist and drop it from memory.
    #[default]
    Evict,
    /// Persist and keep it in memory.
    Keep,
}

impl FromStr for ArchivePolicy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "evict" => Ok(Self::Evict),
            "keep" => Ok(Self::Keep),
            other => Err(EngineError::Configuration(format!(
                "unknown archive policy '{other}', expected 'evict' or 'keep'"
            ))),
        }
    }
}

/// Manager tunables.
#[derive(Debug, Clone, Copy)]
pub struct ManagerSettings {
    /// Upper bound on each store call.
    pub store_timeout: Duration,
    /// Handling of terminated sessions.
    pub archive_policy: ArchivePolicy,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            archive_policy: ArchivePolicy::Evict,
        }
    }
}

type SessionHandle = Arc<Mutex<SessionState>>;

/// Creates, drives, suspends, resumes and ends sessions.
pub struct SessionManager {
    registry: Arc<ScenarioRegistry>,
    repository: Arc<dyn SessionRepository>,
    orchestrator: TurnOrchestrator,
    clock: Arc<dyn Clock>,
    rng: StdMutex<Box<dyn DeterministicRng>>,
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
    /// Live sessions whose termination has not reached the store yet.
    unsaved_endings: Mutex<HashSet<Uuid>>,
    rubrics: HashMap<String, Arc<dyn Rubric>>,
    settings: ManagerSettings,
}

impl SessionManager {
    /// Creates a manager with no live sessions.
    #[must_use]
    pub fn new(
        registry: Arc<ScenarioRegistry>,
        repository: Arc<dyn SessionRepository>,
        generator: Arc<dyn CharacterGenerator>,
        clock: Arc<dyn Clock>,
        rng: Box<dyn DeterministicRng>,
        settings: ManagerSettings,
    ) -> Self {
        Self {
            registry,
            repository,
            orchestrator: TurnOrchestrator::new(generator, Arc::clone(&clock)),
            clock,
            rng: StdMutex::new(rng),
            sessions: RwLock::new(HashMap::new()),
            unsaved_endings: Mutex::new(HashSet::new()),
            rubrics: HashMap::new(),
            settings,
        }
    }

    /// Scores sessions of `scenario_id` with `rubric` instead of the
    /// scenario's configured rubric.
    #[must_use]
    pub fn with_rubric(mut self, scenario_id: impl Into<String>, rubric: Arc<dyn Rubric>) -> Self {
        self.rubrics.insert(scenario_id.into(), rubric);
        self
    }

    /// The scenario registry.
    #[must_use]
    pub fn registry(&self) -> &ScenarioRegistry {
        &self.registry
    }

    /// Number of sessions currently held in memory.
    pub async fn live_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Starts a session and persists its initial state.
    ///
    /// # Errors
    ///
    /// - `Configuration` if the scenario or character is unknown.
    /// - `Infrastructure` if the store fails or times out.
    #[instrument(skip(self, command), fields(correlation_id = %command.correlation_id, scenario_id = %command.scenario_id))]
    pub async fn start_session(&self, command: &StartSession) -> Result<SessionSummary, EngineError> {
        let registered = self.registry.get(&command.scenario_id)?;
        let config = Arc::clone(&registered.config);
        let character_id = match &command.character_id {
            Some(id) => id.clone(),
            None => {
                let index = self
                    .rng
                    .lock()
                    .map_err(|_| EngineError::Infrastructure("rng lock poisoned".to_owned()))?
                    .choose_index(config.characters.len())
                    .ok_or_else(|| {
                        EngineError::Configuration(format!(
                            "scenario '{}' has no characters",
                            config.id
                        ))
                    })?;
                config.characters[index].id.clone()
            }
        };

        let session = SessionState::create(
            Uuid::new_v4(),
            config,
            registered.fingerprint.clone(),
            &character_id,
            self.clock.now(),
        )?;
        self.save(&session).await?;
        let summary = session.summary();
        self.sessions
            .write()
            .await
            .insert(summary.session_id, Arc::new(Mutex::new(session)));

        info!(
            command_type = command.command_type(),
            session_id = %summary.session_id,
            character_id = %summary.character_id,
            "session started"
        );
        Ok(summary)
    }

    /// Submits one line of participant input to a live session.
    ///
    /// # Errors
    ///
    /// Any error of `TurnOrchestrator::submit_action`, plus
    /// `SessionNotFound`, and `InvalidSessionState` when another request
    /// for the session is in flight or the session is not live.
    ///
    /// A turn that ends the session is still returned when saving the
    /// ending fails; the session then stays live and the save is retried
    /// by the next request for it.
    #[instrument(skip(self, command), fields(correlation_id = %command.correlation_id, session_id = %command.session_id))]
    pub async fn submit_action(&self, command: &SubmitAction) -> Result<ActionOutcome, EngineError> {
        let handle = self.live(command.session_id).await?;
        let mut session = try_lock(&handle, command.session_id)?;

        let result = self.orchestrator.submit_action(&mut session, &command.text).await;
        let fatal = result.as_ref().err().filter(|err| err.is_fatal_for_session());
        if let Some(err) = fatal {
            warn!(error = %err, "session flagged unusable");
            if let Err(save_err) = self.save(&session).await {
                warn!(error = %save_err, "could not persist unusable session");
            }
        } else if session.is_terminated() {
            if result.is_ok() || self.ending_unsaved(command.session_id).await {
                if let Err(err) = self.save_ending(&session).await {
                    warn!(error = %err, "could not persist session ending, keeping it live");
                    return result;
                }
            }
            drop(session);
            self.archive(command.session_id).await;
        }
        result
    }

    /// Records a goal hypothesis.
    ///
    /// # Errors
    ///
    /// Same as [`Self::submit_action`], minus generator failures.
    #[instrument(skip(self, command), fields(correlation_id = %command.correlation_id, session_id = %command.session_id))]
    pub async fn declare_hypothesis(&self, command: &DeclareHypothesis) -> Result<u64, EngineError> {
        let handle = self.live(command.session_id).await?;
        let mut session = try_lock(&handle, command.session_id)?;
        self.orchestrator.declare_hypothesis(&mut session, &command.text)
    }

    /// Persists a live session and releases it from memory.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` / `InvalidSessionState` as for actions.
    /// - `SessionTerminated` if the session has ended.
    /// - `Infrastructure` if the store fails; the session stays live.
    #[instrument(skip(self, command), fields(correlation_id = %command.correlation_id, session_id = %command.session_id))]
    pub async fn suspend_session(&self, command: &SuspendSession) -> Result<SessionSummary, EngineError> {
        let handle = self.live(command.session_id).await?;
        let mut session = try_lock(&handle, command.session_id)?;
        if session.is_terminated() {
            return Err(EngineError::SessionTerminated(command.session_id));
        }

        session.set_status(SessionStatus::Suspended);
        if let Err(err) = self.save(&session).await {
            session.set_status(SessionStatus::Active);
            return Err(err);
        }
        let summary = session.summary();
        drop(session);
        self.sessions.write().await.remove(&command.session_id);
        info!("session suspended");
        Ok(summary)
    }

    /// Reloads a suspended session, validating every invariant.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the store has no such session.
    /// - `CorruptedSession` if the stored state is invalid.
    /// - `SessionTerminated` if the session has ended.
    /// - `InvalidSessionState` if the session is already live.
    #[instrument(skip(self, command), fields(correlation_id = %command.correlation_id, session_id = %command.session_id))]
    pub async fn resume_session(&self, command: &ResumeSession) -> Result<SessionSummary, EngineError> {
        let id = command.session_id;
        if self.sessions.read().await.contains_key(&id) {
            return Err(EngineError::InvalidSessionState {
                session_id: id,
                reason: "session is already live".to_owned(),
            });
        }

        let mut session = self.load(id).await?;
        if session.is_terminated() {
            return Err(EngineError::SessionTerminated(id));
        }
        session.set_status(SessionStatus::Active);
        self.save(&session).await?;
        let summary = session.summary();

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&id) {
            return Err(EngineError::InvalidSessionState {
                session_id: id,
                reason: "session is already live".to_owned(),
            });
        }
        sessions.insert(id, Arc::new(Mutex::new(session)));
        info!(turns = summary.turn_count, "session resumed");
        Ok(summary)
    }

    /// Ends a session and scores it. Ending an already-terminated session
    /// is a no-op that returns the same score.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session is neither live nor stored.
    /// - `CorruptedSession` if the stored state is invalid.
    /// - `InvalidSessionState` if another request is in flight.
    /// - `Infrastructure` if the store fails.
    #[instrument(skip(self, command), fields(correlation_id = %command.correlation_id, session_id = %command.session_id))]
    pub async fn end_session(&self, command: &EndSession) -> Result<ScoreResult, EngineError> {
        let id = command.session_id;
        let live = self.sessions.read().await.get(&id).cloned();

        let result = if let Some(handle) = live {
            let mut session = try_lock(&handle, id)?;
            let ended_now = self.orchestrator.terminate(&mut session, TerminationReason::Forced);
            if ended_now || self.ending_unsaved(id).await {
                self.save_ending(&session).await?;
            }
            self.score_session(&session)
        } else {
            let mut session = self.load(id).await?;
            if self.orchestrator.terminate(&mut session, TerminationReason::Forced) {
                self.save(&session).await?;
            }
            self.score_session(&session)
        };

        if result.is_ok() {
            self.archive(id).await;
        }
        result
    }

    /// Scores a terminated session.
    ///
    /// # Errors
    ///
    /// `SessionNotComplete` unless terminated; lookup errors otherwise.
    pub async fn score(&self, session_id: Uuid) -> Result<ScoreResult, EngineError> {
        self.inspect(session_id, |session| self.score_session(session))
            .await?
    }

    /// Headline facts of a live or stored session.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` or `CorruptedSession`.
    pub async fn summary(&self, session_id: Uuid) -> Result<SessionSummary, EngineError> {
        self.inspect(session_id, SessionState::summary).await
    }

    /// What the participant may currently see.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` or `CorruptedSession`.
    pub async fn participant_view(&self, session_id: Uuid) -> Result<ParticipantView, EngineError> {
        self.inspect(session_id, participant_view).await
    }

    fn score_session(&self, session: &SessionState) -> Result<ScoreResult, EngineError> {
        match self.rubrics.get(&session.scenario().id) {
            Some(rubric) => score(session, rubric.as_ref()),
            None => score(session, &ConfiguredRubric::from_scenario(session.scenario())),
        }
    }

    async fn live(&self, session_id: Uuid) -> Result<SessionHandle, EngineError> {
        if let Some(handle) = self.sessions.read().await.get(&session_id) {
            return Ok(Arc::clone(handle));
        }
        match self.load_stored(session_id).await? {
            Some(stored) if stored.status == SessionStatus::Terminated.as_str() => {
                Err(EngineError::SessionTerminated(session_id))
            }
            Some(_) => Err(EngineError::InvalidSessionState {
                session_id,
                reason: "session is suspended; resume it first".to_owned(),
            }),
            None => Err(EngineError::SessionNotFound(session_id)),
        }
    }

    /// Runs `f` on the live session, or on the stored one if not live.
    async fn inspect<R>(
        &self,
        session_id: Uuid,
        f: impl FnOnce(&SessionState) -> R,
    ) -> Result<R, EngineError> {
        let live = self.sessions.read().await.get(&session_id).cloned();
        if let Some(handle) = live {
            let session = handle.lock().await;
            return Ok(f(&session));
        }
        let session = self.load(session_id).await?;
        Ok(f(&session))
    }

    async fn archive(&self, session_id: Uuid) {
        if self.settings.archive_policy == ArchivePolicy::Evict {
            self.sessions.write().await.remove(&session_id);
        }
    }

    async fn ending_unsaved(&self, session_id: Uuid) -> bool {
        self.unsaved_endings.lock().await.contains(&session_id)
    }

    /// Saves a terminated live session, remembering a failure so the next
    /// request retries the save instead of treating the ending as durable.
    async fn save_ending(&self, session: &SessionState) -> Result<(), EngineError> {
        let result = self.save(session).await;
        let mut unsaved = self.unsaved_endings.lock().await;
        if result.is_ok() {
            unsaved.remove(&session.id());
        } else {
            unsaved.insert(session.id());
        }
        result
    }

    async fn save(&self, session: &SessionState) -> Result<(), EngineError> {
        let stored = to_stored(session, self.clock.now())?;
        match tokio::time::timeout(self.settings.store_timeout, self.repository.save(&stored)).await
        {
            Ok(result) => result,
            Err(_) => Err(self.store_timed_out()),
        }
    }

    async fn load_stored(&self, session_id: Uuid) -> Result<Option<StoredSession>, EngineError> {
        match tokio::time::timeout(self.settings.store_timeout, self.repository.load(session_id))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(self.store_timed_out()),
        }
    }

    async fn load(&self, session_id: Uuid) -> Result<SessionState, EngineError> {
        let stored = self
            .load_stored(session_id)
            .await?
            .ok_or(EngineError::SessionNotFound(session_id))?;
        from_stored(&stored, &self.registry).inspect_err(|err| {
            warn!(%session_id, error = %err, "stored session failed validation");
        })
    }

    fn store_timed_out(&self) -> EngineError {
        EngineError::Infrastructure(format!(
            "session store timed out after {} ms",
            self.settings.store_timeout.as_millis()
        ))
    }
}

fn try_lock(
    handle: &SessionHandle,
    session_id: Uuid,
) -> Result<tokio::sync::MutexGuard<'_, SessionState>, EngineError> {
    handle
        .try_lock()
        .map_err(|_| EngineError::InvalidSessionState {
            session_id,
            reason: "another request for this session is in progress".to_owned(),
        })
}
