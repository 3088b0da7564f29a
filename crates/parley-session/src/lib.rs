//! Parley: Session, Turn Orchestration and Scoring bounded context.
//!
//! One canonical [`domain::state::SessionState`] per session, two views
//! over it (the generator context and the participant view), the turn
//! state machine that advances it, the goal-inference scorer that grades
//! it, and the lifecycle manager that owns live sessions.

pub mod application;
pub mod domain;
