//! Route modules.

pub mod health;
pub mod scenarios;
pub mod sessions;
