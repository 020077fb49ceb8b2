//! Fleet engine binary for the warehouse fleet simulation.
//!
//! Wires the entity store, the run-state controller, and the observer API
//! together, then serves until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing; JSON when `FLEET_LOG_JSON` is set)
//! 2. Load configuration from `fleet-config.yaml` (or `FLEET_CONFIG`)
//! 3. Open the entity store: `PostgreSQL` when a database URL is
//!    configured, otherwise an in-memory store seeded with a demo fleet
//! 4. Create the controller (stopped), optionally start it
//! 5. Serve the observer API until `Ctrl-C`
//! 6. Cancel both schedules and close the store

mod error;
mod seed;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fleet_core::{FleetConfig, FleetController};
use fleet_db::{EntityStore, MemoryStore, PostgresConfig, PostgresStore};
use fleet_observer::{AppState, ServerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "fleet-config.yaml";

/// Application entry point for the fleet engine.
///
/// # Errors
///
/// Returns an error if configuration, store setup, or the observer
/// server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    init_tracing();
    info!("fleet-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        tick_interval_ms = config.simulation.tick_interval_ms,
        package_interval_ms = config.simulation.package_interval_ms,
        seed = config.simulation.seed,
        autostart = config.fleet.autostart,
        "Configuration loaded"
    );

    // 3. Open the store and run.
    match config.infrastructure.database_url.clone() {
        Some(url) => {
            info!("Connecting to PostgreSQL");
            let infra = &config.infrastructure;
            let pg_config = PostgresConfig::new(&url)
                .with_max_connections(infra.db_max_connections)
                .with_connect_timeout(Duration::from_secs(infra.db_connect_timeout_secs));
            let store = PostgresStore::connect(&pg_config)
                .await
                .map_err(EngineError::from)?;
            store.run_migrations().await.map_err(EngineError::from)?;
            info!("PostgreSQL store ready");
            let store = Arc::new(store);
            run(Arc::clone(&store), &config).await?;
            store.close().await;
        }
        None => {
            info!("No database configured, using in-memory store with demo fleet");
            let store = MemoryStore::new();
            seed::seed_demo_fleet(&store, &config.fleet, config.simulation.seed)
                .await
                .map_err(EngineError::from)?;
            run(Arc::new(store), &config).await?;
        }
    }

    info!("fleet-engine shutdown complete");
    Ok(())
}

/// Build the controller, serve the observer API until `Ctrl-C`, then
/// cancel the schedules.
async fn run<S: EntityStore>(store: Arc<S>, config: &FleetConfig) -> Result<(), EngineError> {
    // 4. Create the controller.
    let controller = Arc::new(FleetController::from_config(store, config));
    if config.fleet.autostart {
        let state = controller.start().await;
        info!(%state, "Simulation autostarted");
    } else {
        info!("Simulation stopped; start it via POST /api/operator/start");
    }

    // 5. Serve the observer API.
    let server_config = ServerConfig {
        host: config.infrastructure.observer_host.clone(),
        port: config.infrastructure.observer_port,
    };
    let app_state = Arc::new(AppState::new(Arc::clone(&controller)));
    let served = fleet_observer::start_server(&server_config, app_state, shutdown_signal()).await;

    // 6. Cancel both schedules whatever happened to the server.
    controller.shutdown();
    served?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var_os("FLEET_LOG_JSON").is_some() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Load `fleet-config.yaml` (or the file named by `FLEET_CONFIG`). A
/// missing file means defaults; environment overrides apply either way.
fn load_config() -> Result<FleetConfig, EngineError> {
    let path = std::env::var_os("FLEET_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = if path.exists() {
        info!(path = %path.display(), "Loading config file");
        FleetConfig::from_file(&path)?
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
        let mut config = FleetConfig::default();
        config.infrastructure.apply_env_overrides();
        config
    };
    config.validate()?;
    Ok(config)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C; shutting down"),
    }
}
