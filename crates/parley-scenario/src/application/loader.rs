//! Reads YAML and JSON scenario files.

use std::path::Path;

use parley_core::error::EngineError;

use super::registry::ScenarioRegistry;
use crate::domain::config::ScenarioConfig;

/// Authoring format of a scenario document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioFormat {
    /// YAML document.
    Yaml,
    /// JSON document.
    Json,
}

impl ScenarioFormat {
    /// Infers the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parses a scenario document. The result is not yet validated.
///
/// # Errors
///
/// Returns `EngineError::Configuration` if the document is malformed.
pub fn parse_scenario(source: &str, format: ScenarioFormat) -> Result<ScenarioConfig, EngineError> {
    match format {
        ScenarioFormat::Yaml => crate::yaml::from_str(source)
            .map_err(|e| EngineError::Configuration(format!("invalid scenario YAML: {e}"))),
        ScenarioFormat::Json => serde_json::from_str(source)
            .map_err(|e| EngineError::Configuration(format!("invalid scenario JSON: {e}"))),
    }
}

/// Reads and parses one scenario file.
///
/// # Errors
///
/// Returns `EngineError::Configuration` if the file cannot be read, has an
/// unsupported extension, or is malformed.
pub fn load_scenario_file(path: &Path) -> Result<ScenarioConfig, EngineError> {
    let format = ScenarioFormat::from_path(path).ok_or_else(|| {
        EngineError::Configuration(format!(
            "unsupported scenario file extension: {}",
            path.display()
        ))
    })?;
    let source = std::fs::read_to_string(path).map_err(|e| {
        EngineError::Configuration(format!("cannot read {}: {e}", path.display()))
    })?;
    parse_scenario(&source, format).map_err(|e| match e {
        EngineError::Configuration(msg) => {
            EngineError::Configuration(format!("{}: {msg}", path.display()))
        }
        other => other,
    })
}

/// Loads every `*.yaml`, `*.yml` and `*.json` file in `dir`, in file-name
/// order, into a new registry. Other files are ignored.
///
/// # Errors
///
/// Returns `EngineError::Configuration` on the first unreadable, malformed,
/// invalid or duplicate scenario.
pub fn load_scenario_dir(dir: &Path) -> Result<ScenarioRegistry, EngineError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        EngineError::Configuration(format!("cannot read scenario directory {}: {e}", dir.display()))
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            EngineError::Configuration(format!("cannot list {}: {e}", dir.display()))
        })?;
        let path = entry.path();
        if path.is_file() && ScenarioFormat::from_path(&path).is_some() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut registry = ScenarioRegistry::new();
    for path in &paths {
        let config = load_scenario_file(path)?;
        registry.register(config)?;
        tracing::info!(path = %path.display(), "loaded scenario");
    }
    Ok(registry)
}
