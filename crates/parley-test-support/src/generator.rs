//! Test generators: `CharacterGenerator` implementations for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parley_core::error::EngineError;
use parley_session::application::generator::CharacterGenerator;
use parley_session::domain::context::GeneratorContext;

/// A generator that replays a script of results and records every context
/// it receives. Once the script runs out it repeats `fallback`, or fails
/// with `GeneratorUnavailable` when there is none.
#[derive(Debug)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<String, EngineError>>>,
    fallback: Option<String>,
    contexts: Mutex<Vec<GeneratorContext>>,
}

impl ScriptedGenerator {
    /// Create a generator that returns `script` in order.
    #[must_use]
    pub fn new(script: Vec<Result<String, EngineError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            contexts: Mutex::new(Vec::new()),
        }
    }

    /// Create a generator that always answers `reply`.
    #[must_use]
    pub fn replying(reply: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(reply.to_owned()),
            contexts: Mutex::new(Vec::new()),
        }
    }

    /// Returns every context received, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn contexts(&self) -> Vec<GeneratorContext> {
        self.contexts.lock().unwrap().clone()
    }

    /// Number of calls received.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }
}

#[async_trait]
impl CharacterGenerator for ScriptedGenerator {
    async fn generate(&self, context: &GeneratorContext) -> Result<String, EngineError> {
        self.contexts.lock().unwrap().push(context.clone());
        let next = self.script.lock().unwrap().pop_front();
        match (next, &self.fallback) {
            (Some(result), _) => result,
            (None, Some(reply)) => Ok(reply.clone()),
            (None, None) => Err(EngineError::GeneratorUnavailable("script exhausted".into())),
        }
    }
}

/// A generator that fails every call.
#[derive(Debug)]
pub struct FailingGenerator {
    retryable: bool,
    calls: AtomicUsize,
}

impl FailingGenerator {
    /// Fails with `GeneratorUnavailable`, which the orchestrator retries.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            retryable: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails with an error the orchestrator must not retry.
    #[must_use]
    pub fn non_retryable() -> Self {
        Self {
            retryable: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CharacterGenerator for FailingGenerator {
    async fn generate(&self, _context: &GeneratorContext) -> Result<String, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.retryable {
            Err(EngineError::GeneratorUnavailable("connection refused".into()))
        } else {
            Err(EngineError::Infrastructure("generator rejected the request".into()))
        }
    }
}

/// A generator that sleeps before answering. Pair it with a short scenario
/// timeout to exercise the timeout path, or with concurrent requests to
/// observe per-session serialization.
#[derive(Debug)]
pub struct SlowGenerator {
    delay: Duration,
    reply: String,
    calls: AtomicUsize,
}

impl SlowGenerator {
    /// Create a generator that answers `reply` after `delay`.
    #[must_use]
    pub fn new(delay: Duration, reply: &str) -> Self {
        Self {
            delay,
            reply: reply.to_owned(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CharacterGenerator for SlowGenerator {
    async fn generate(&self, _context: &GeneratorContext) -> Result<String, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.clone())
    }
}
