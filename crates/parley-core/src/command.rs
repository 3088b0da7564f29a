//! Command abstractions.

use uuid::Uuid;

/// Trait that every lifecycle command implements.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Correlation ID used to trace this command through the engine.
    fn correlation_id(&self) -> Uuid;

    /// The session the command targets, if it already exists.
    fn session_id(&self) -> Option<Uuid> {
        None
    }
}
