//! Server configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use parley_session::application::lifecycle::{ArchivePolicy, ManagerSettings};

use crate::error::AppError;

/// Where session snapshots are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// PostgreSQL at the given URL.
    Postgres(String),
    /// One JSON file per session under the given directory.
    JsonFiles(PathBuf),
}

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Directory of scenario files.
    pub scenario_dir: PathBuf,
    /// Session store.
    pub store: StoreConfig,
    /// Program (and arguments) run once per character response.
    pub generator_command: Vec<String>,
    /// Seed for character selection; random when unset.
    pub rng_seed: Option<u64>,
    /// Lifecycle manager tunables.
    pub manager: ManagerSettings,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?;
        let scenario_dir = PathBuf::from(lookup("SCENARIO_DIR").unwrap_or_else(|| "scenarios".to_string()));

        let store = match lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            Some(url) => StoreConfig::Postgres(url),
            None => StoreConfig::JsonFiles(PathBuf::from(
                lookup("SESSION_DIR").unwrap_or_else(|| "sessions".to_string()),
            )),
        };

        let generator_command: Vec<String> = lookup("GENERATOR_COMMAND")
            .ok_or_else(|| {
                AppError::Config("GENERATOR_COMMAND environment variable must be set".to_string())
            })?
            .split_whitespace()
            .map(str::to_owned)
            .collect();
        if generator_command.is_empty() {
            return Err(AppError::Config("GENERATOR_COMMAND must not be empty".to_string()));
        }

        let rng_seed = lookup("RNG_SEED")
            .map(|seed| {
                seed.parse::<u64>()
                    .map_err(|e| AppError::Config(format!("RNG_SEED must be a valid u64: {e}")))
            })
            .transpose()?;

        let mut manager = ManagerSettings::default();
        if let Some(ms) = lookup("STORE_TIMEOUT_MS") {
            let ms: u64 = ms
                .parse()
                .map_err(|e| AppError::Config(format!("STORE_TIMEOUT_MS must be a valid u64: {e}")))?;
            if ms == 0 {
                return Err(AppError::Config("STORE_TIMEOUT_MS must be positive".to_string()));
            }
            manager.store_timeout = Duration::from_millis(ms);
        }
        if let Some(policy) = lookup("ARCHIVE_POLICY") {
            manager.archive_policy = policy.parse::<ArchivePolicy>()?;
        }

        Ok(Self {
            host,
            port,
            scenario_dir,
            store,
            generator_command,
            rng_seed,
            manager,
        })
    }
}
