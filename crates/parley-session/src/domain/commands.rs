//! Commands accepted by the session lifecycle manager.

use parley_core::command::Command;
use uuid::Uuid;

/// Command to start a session.
#[derive(Debug, Clone)]
pub struct StartSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Scenario to bind.
    pub scenario_id: String,
    /// Character to bind; picked at random when `None`.
    pub character_id: Option<String>,
}

impl Command for StartSession {
    fn command_type(&self) -> &'static str {
        "session.start"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to submit one line of participant input.
#[derive(Debug, Clone)]
pub struct SubmitAction {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: Uuid,
    /// Raw input: an action or a `/command`.
    pub text: String,
}

impl Command for SubmitAction {
    fn command_type(&self) -> &'static str {
        "session.submit_action"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn session_id(&self) -> Option<Uuid> {
        Some(self.session_id)
    }
}

/// Command to declare a goal hypothesis.
#[derive(Debug, Clone)]
pub struct DeclareHypothesis {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: Uuid,
    /// The hypothesis text.
    pub text: String,
}

impl Command for DeclareHypothesis {
    fn command_type(&self) -> &'static str {
        "session.declare_hypothesis"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn session_id(&self) -> Option<Uuid> {
        Some(self.session_id)
    }
}

/// Command to persist a session and release it from memory.
#[derive(Debug, Clone)]
pub struct SuspendSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: Uuid,
}

impl Command for SuspendSession {
    fn command_type(&self) -> &'static str {
        "session.suspend"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn session_id(&self) -> Option<Uuid> {
        Some(self.session_id)
    }
}

/// Command to reload a suspended session.
#[derive(Debug, Clone)]
pub struct ResumeSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: Uuid,
}

impl Command for ResumeSession {
    fn command_type(&self) -> &'static str {
        "session.resume"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn session_id(&self) -> Option<Uuid> {
        Some(self.session_id)
    }
}

/// Command to end a session and score it.
#[derive(Debug, Clone)]
pub struct EndSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: Uuid,
}

impl Command for EndSession {
    fn command_type(&self) -> &'static str {
        "session.end"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn session_id(&self) -> Option<Uuid> {
        Some(self.session_id)
    }
}
