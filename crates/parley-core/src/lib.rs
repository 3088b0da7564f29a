//! Parley Core: shared abstractions for the scenario engine.
//!
//! This crate defines the error taxonomy and the collaborator traits
//! (time, randomness, persistence) that every other crate depends on.
//! It contains no infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
pub mod repository;
pub mod rng;
