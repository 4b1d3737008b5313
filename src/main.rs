//! rodeo-gate server entry point.
//!
//! Starts the Axum HTTP server for ticket issuance and redemption.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use rodeo_gate::api;
use rodeo_gate::app_state::AppState;
use rodeo_gate::config::{GateConfig, StoreBackend};
use rodeo_gate::service::TicketService;
use rodeo_gate::store::{MemoryStore, PostgresStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GateConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting rodeo-gate");

    // Build store layer
    let store = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .min_connections(config.database_min_connections)
                .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
                .connect(&config.database_url)
                .await?;
            sqlx::migrate!().run(&pool).await?;
            tracing::info!("connected to postgres, migrations applied");
            Store::Postgres(PostgresStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store: all state is lost on restart");
            Store::Memory(MemoryStore::new())
        }
    };

    // Build service layer
    let ticket_service = Arc::new(TicketService::new(store, config.ingest_token.clone()));

    // Build application state
    let app_state = AppState { ticket_service };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
