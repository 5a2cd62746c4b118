//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, MemoryAdapter},
    config::{Config, StoreBackend},
    error::ApiError,
    web::{router, state::AppState},
};
use guardian_core::{IdentityService, RecordStore, SimulatedBiometricGate};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect the Identity Provider and Record Store ---
    let (identity, store): (Arc<dyn IdentityService>, Arc<dyn RecordStore>) =
        match config.store_backend {
            StoreBackend::Postgres => {
                let database_url = config
                    .database_url
                    .as_deref()
                    .ok_or_else(|| ApiError::Internal("DATABASE_URL is required".to_string()))?;
                info!("Connecting to database...");
                let db_pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect(database_url)
                    .await?;
                let db_adapter = Arc::new(DbAdapter::new(db_pool));
                info!("Running database migrations...");
                db_adapter.run_migrations().await?;
                info!("Database migrations complete.");
                let identity: Arc<dyn IdentityService> = db_adapter.clone();
                let store: Arc<dyn RecordStore> = db_adapter;
                (identity, store)
            }
            StoreBackend::Memory => {
                warn!("Using the in-memory store; all data is lost on shutdown.");
                let memory = Arc::new(MemoryAdapter::new());
                let identity: Arc<dyn IdentityService> = memory.clone();
                let store: Arc<dyn RecordStore> = memory;
                (identity, store)
            }
        };

    // --- 3. Initialize the Biometric Gate ---
    let gate = Arc::new(SimulatedBiometricGate::new(config.gate_delay));
    info!(
        "Biometric gate is simulated ({:?} delay, {:?} timeout).",
        config.gate_delay, config.gate_timeout
    );

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(identity, store, gate, config.clone()));
    let _session_listener = app_state.spawn_session_listener();

    // --- 5. Create the Web Router ---
    let app = router(app_state)?;

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
