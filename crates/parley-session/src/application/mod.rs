//! Application services: the turn orchestrator, the lifecycle manager and
//! the collaborator seams they call out through.

pub mod generator;
pub mod lifecycle;
pub mod orchestrator;
pub mod persistence;
