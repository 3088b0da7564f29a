//! Parley: Scenario Configuration bounded context.
//!
//! Immutable, validated descriptions of a game: the characters on offer,
//! which of their attributes and goals the participant may see, the
//! world-state triggers, the scoring rubric, and the session limits.

pub mod application;
pub mod domain;
pub mod yaml;
