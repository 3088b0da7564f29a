//! The character-behavior generator seam.

use async_trait::async_trait;
use parley_core::error::EngineError;

use crate::domain::context::GeneratorContext;

/// An external producer of in-character text.
///
/// Implementations report transport failures as
/// `EngineError::GeneratorUnavailable`. The orchestrator applies its own
/// timeout around every call.
#[async_trait]
pub trait CharacterGenerator: Send + Sync {
    /// Produces the character's response to `context.participant_action`.
    async fn generate(&self, context: &GeneratorContext) -> Result<String, EngineError>;
}
