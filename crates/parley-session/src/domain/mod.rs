//! Domain model for sessions.

pub mod action;
pub mod commands;
pub mod context;
pub mod observable;
pub mod scoring;
pub mod state;
pub mod visibility;
