//! Domain model for scenario configuration.

pub mod character;
pub mod condition;
pub mod config;
pub mod goal;
pub mod rubric;
pub mod trigger;
mod validation;
pub mod visibility;
