//! Read-only registry of accepted scenarios.
//!
//! The registry is filled once at startup and shared behind an `Arc`
//! afterwards; it offers no removal or mutation of registered scenarios.

use std::collections::BTreeMap;
use std::sync::Arc;

use parley_core::error::EngineError;

use crate::domain::config::ScenarioConfig;

/// A validated scenario together with its content fingerprint.
#[derive(Debug, Clone)]
pub struct RegisteredScenario {
    /// The immutable scenario.
    pub config: Arc<ScenarioConfig>,
    /// SHA-256 of the scenario's canonical JSON form.
    pub fingerprint: String,
}

/// Scenario lookup by id.
#[derive(Debug, Default)]
pub struct ScenarioRegistry {
    scenarios: BTreeMap<String, RegisteredScenario>,
}

impl ScenarioRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers a scenario.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if the scenario is invalid or its
    /// id is already registered.
    pub fn register(&mut self, config: ScenarioConfig) -> Result<&RegisteredScenario, EngineError> {
        config.validate()?;
        if self.scenarios.contains_key(&config.id) {
            return Err(EngineError::Configuration(format!(
                "scenario '{}' is already registered",
                config.id
            )));
        }
        let fingerprint = config.fingerprint()?;
        let id = config.id.clone();
        tracing::debug!(scenario_id = %id, %fingerprint, "scenario registered");
        Ok(&*self.scenarios.entry(id).or_insert(RegisteredScenario {
            config: Arc::new(config),
            fingerprint,
        }))
    }

    /// Looks up a scenario.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if no scenario has this id.
    pub fn get(&self, scenario_id: &str) -> Result<&RegisteredScenario, EngineError> {
        self.scenarios
            .get(scenario_id)
            .ok_or_else(|| EngineError::Configuration(format!("unknown scenario '{scenario_id}'")))
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.scenarios.keys().map(String::as_str)
    }

    /// Iterates over registered scenarios in id order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredScenario> {
        self.scenarios.values()
    }

    /// Number of registered scenarios.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}
