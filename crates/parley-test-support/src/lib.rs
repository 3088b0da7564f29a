//! Shared test doubles and fixtures for the Parley scenario engine.

mod clock;
pub mod fixtures;
mod generator;
mod repository;
mod rng;

pub use clock::{FixedClock, ManualClock};
pub use generator::{FailingGenerator, ScriptedGenerator, SlowGenerator};
pub use repository::{FailingSessionRepository, InMemorySessionRepository};
pub use rng::{MockRng, SequenceRng};
