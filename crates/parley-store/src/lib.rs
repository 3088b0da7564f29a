//! Parley Store: session persistence backends.
//!
//! Both backends implement `parley_core::repository::SessionRepository` and
//! replace a session's snapshot atomically.

pub mod json_file_repository;
pub mod pg_session_repository;
pub mod schema;
