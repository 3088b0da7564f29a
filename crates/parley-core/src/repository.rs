//! Session persistence abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

/// Stored representation of one session.
///
/// The engine owns the `payload` format; stores treat it as an opaque JSON
/// document and only index the summary columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    /// Session identifier.
    pub session_id: Uuid,
    /// Scenario the session is bound to.
    pub scenario_id: String,
    /// Number of completed turns at save time.
    pub turn_count: u64,
    /// Lifecycle status at save time (`active`, `suspended`, `terminated`).
    pub status: String,
    /// Serialized session state.
    pub payload: serde_json::Value,
    /// When the snapshot was written.
    pub saved_at: DateTime<Utc>,
}

/// Repository trait for saving and loading whole sessions.
///
/// Implementations must give session-level isolation: a concurrent `load`
/// observes either the previous or the new snapshot, never a partial write.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert or replace the snapshot for `session.session_id`.
    async fn save(&self, session: &StoredSession) -> Result<(), EngineError>;

    /// Load the latest snapshot, or `None` if the session was never saved.
    async fn load(&self, session_id: Uuid) -> Result<Option<StoredSession>, EngineError>;
}
