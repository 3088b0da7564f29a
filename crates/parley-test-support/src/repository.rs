//! Test repositories: `SessionRepository` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use parley_core::error::EngineError;
use parley_core::repository::{SessionRepository, StoredSession};
use uuid::Uuid;

/// A session repository backed by a `HashMap`. Records how many saves it
/// received.
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: Mutex<HashMap<Uuid, StoredSession>>,
    saves: Mutex<usize>,
}

impl InMemorySessionRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored snapshot for `session_id`, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn stored(&self, session_id: Uuid) -> Option<StoredSession> {
        self.sessions.lock().unwrap().get(&session_id).cloned()
    }

    /// Replaces a snapshot directly, bypassing `save` accounting. Used to
    /// plant corrupted state.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn put(&self, session: StoredSession) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.session_id, session);
    }

    /// Number of `save` calls received.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn save(&self, session: &StoredSession) -> Result<(), EngineError> {
        *self.saves.lock().unwrap() += 1;
        self.put(session.clone());
        Ok(())
    }

    async fn load(&self, session_id: Uuid) -> Result<Option<StoredSession>, EngineError> {
        Ok(self.stored(session_id))
    }
}

/// A session repository that always returns an infrastructure error. Useful
/// for testing error-handling paths.
#[derive(Debug)]
pub struct FailingSessionRepository;

#[async_trait]
impl SessionRepository for FailingSessionRepository {
    async fn save(&self, _session: &StoredSession) -> Result<(), EngineError> {
        Err(EngineError::Infrastructure("connection refused".into()))
    }

    async fn load(&self, _session_id: Uuid) -> Result<Option<StoredSession>, EngineError> {
        Err(EngineError::Infrastructure("connection refused".into()))
    }
}
