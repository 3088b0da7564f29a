//! Engine error taxonomy.

use thiserror::Error;
use uuid::Uuid;

/// Top-level error type shared by every engine component.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Scenario or character data failed validation. Fatal at load time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The caller used the turn state machine out of order.
    #[error("session {session_id} cannot accept this request: {reason}")]
    InvalidSessionState {
        /// The session that rejected the request.
        session_id: Uuid,
        /// Why the request was rejected.
        reason: String,
    },

    /// The session has already terminated.
    #[error("session {0} is terminated")]
    SessionTerminated(Uuid),

    /// A turn record would break the strictly increasing turn index.
    #[error("invalid turn sequence: expected turn {expected}, got {actual}")]
    InvalidTurnSequence {
        /// The index the next turn must carry.
        expected: u64,
        /// The index that was supplied.
        actual: u64,
    },

    /// Persisted session state violates a session invariant.
    #[error("session {session_id} is corrupted: {reason}")]
    CorruptedSession {
        /// The session that failed validation.
        session_id: Uuid,
        /// The violated invariant.
        reason: String,
    },

    /// The character generator could not be reached or refused the request.
    #[error("character generator unavailable: {0}")]
    GeneratorUnavailable(String),

    /// The character generator did not answer in time.
    #[error("character generator timed out after {timeout_ms} ms")]
    GeneratorTimeout {
        /// The timeout that elapsed.
        timeout_ms: u64,
    },

    /// The turn could not be completed; the session is unchanged.
    #[error("turn failed for session {session_id} after {attempts} attempt(s)")]
    TurnFailed {
        /// The session whose turn failed.
        session_id: Uuid,
        /// Number of generator attempts made.
        attempts: u32,
        /// The error from the last attempt.
        #[source]
        last_error: Box<EngineError>,
    },

    /// Scoring was requested before the session terminated.
    #[error("session {0} has not completed")]
    SessionNotComplete(Uuid),

    /// No live or persisted session with this identifier exists.
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// The participant's action text was rejected before any state change.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl EngineError {
    /// Whether the failure may be retried automatically. Only failures of
    /// the external character generator qualify.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::GeneratorUnavailable(_) | Self::GeneratorTimeout { .. }
        )
    }

    /// Whether the failure leaves the affected session unusable.
    #[must_use]
    pub fn is_fatal_for_session(&self) -> bool {
        matches!(
            self,
            Self::InvalidTurnSequence { .. } | Self::CorruptedSession { .. }
        )
    }

    /// Stable machine-readable code for presentation layers.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::InvalidSessionState { .. } => "invalid_session_state",
            Self::SessionTerminated(_) => "session_terminated",
            Self::InvalidTurnSequence { .. } => "invalid_turn_sequence",
            Self::CorruptedSession { .. } => "corrupted_session",
            Self::GeneratorUnavailable(_) => "generator_unavailable",
            Self::GeneratorTimeout { .. } => "generator_timeout",
            Self::TurnFailed { .. } => "turn_failed",
            Self::SessionNotComplete(_) => "session_not_complete",
            Self::SessionNotFound(_) => "session_not_found",
            Self::InvalidAction(_) => "invalid_action",
            Self::Infrastructure(_) => "infrastructure_error",
        }
    }
}
