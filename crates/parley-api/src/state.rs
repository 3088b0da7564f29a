//! Shared application state.

use std::sync::Arc;

use parley_session::application::lifecycle::SessionManager;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Owner of every live session.
    pub manager: Arc<SessionManager>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }
}
