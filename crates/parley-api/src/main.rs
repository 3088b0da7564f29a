//! Parley API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use parley_api::config::{AppConfig, StoreConfig};
use parley_api::error::AppError;
use parley_api::generator::CommandGenerator;
use parley_api::state::AppState;
use parley_core::clock::SystemClock;
use parley_core::repository::SessionRepository;
use parley_core::rng::SystemRng;
use parley_scenario::application::loader::load_scenario_dir;
use parley_session::application::lifecycle::SessionManager;
use parley_store::json_file_repository::JsonFileSessionRepository;
use parley_store::pg_session_repository::PgSessionRepository;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Parley API server");

    let config = AppConfig::from_env()?;

    let registry = load_scenario_dir(&config.scenario_dir)?;
    if registry.is_empty() {
        return Err(AppError::Config(format!(
            "no scenarios found in {}",
            config.scenario_dir.display()
        )));
    }
    tracing::info!(
        scenarios = registry.len(),
        dir = %config.scenario_dir.display(),
        "scenarios loaded"
    );

    let repository: Arc<dyn SessionRepository> = match &config.store {
        StoreConfig::Postgres(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await?;
            let repository = PgSessionRepository::new(pool);
            repository.ensure_schema().await?;
            tracing::info!("persisting sessions to PostgreSQL");
            Arc::new(repository)
        }
        StoreConfig::JsonFiles(dir) => {
            let repository = JsonFileSessionRepository::open(dir.clone()).await?;
            tracing::info!(dir = %dir.display(), "persisting sessions to JSON files");
            Arc::new(repository)
        }
    };

    let generator = Arc::new(CommandGenerator::new(&config.generator_command)?);
    let rng = match config.rng_seed {
        Some(seed) => SystemRng::seeded(seed),
        None => SystemRng::from_os_rng(),
    };

    let manager = SessionManager::new(
        Arc::new(registry),
        repository,
        generator,
        Arc::new(SystemClock),
        Box::new(rng),
        config.manager,
    );
    let app = parley_api::build_router(AppState::new(Arc::new(manager)));

    // Start server.
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
