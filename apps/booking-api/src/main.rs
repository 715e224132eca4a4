//! # Marquee Booking API
//!
//! HTTP surface for the inventory reservation engine.
//!
//! ## Architecture
//! ```text
//! Client ───► HTTP (axum) ───► ReservationEngine ───► SQLite (WAL)
//!                  │
//!                  └── janitor task: sweeps long-expired holds
//! ```
//!
//! The handlers are a thin layer: normalize business-local times to UTC,
//! call the engine, map typed errors onto HTTP statuses. Every availability
//! decision is made inside the engine's transaction, never here.

mod config;
mod error;
mod routes;
mod state;

use std::net::SocketAddr;

use chrono::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::ApiConfig;
use crate::state::AppState;
use marquee_db::{Database, DbConfig, EngineConfig, ReservationEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting Marquee booking API...");

    // Load configuration
    let config = ApiConfig::load()?;
    info!(
        port = config.http_port,
        database = %config.database_path,
        hold_ttl_minutes = config.hold_ttl_minutes,
        "Configuration loaded"
    );

    // Connect to the database (runs migrations)
    let db = Database::new(DbConfig::new(&config.database_path)).await?;
    info!("Database ready");

    // Build the engine
    let engine = ReservationEngine::with_config(
        db.clone(),
        EngineConfig {
            hold_ttl_minutes: config.hold_ttl_minutes,
            ..EngineConfig::default()
        },
    );

    // Spawn the stale-hold janitor. Hygiene only: expired holds already
    // count for nothing, swept or not.
    let janitor_engine = engine.clone();
    let janitor_interval = config.janitor_interval_secs;
    let janitor_grace = Duration::hours(config.janitor_grace_hours);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(janitor_interval));
        loop {
            ticker.tick().await;
            match janitor_engine.expire_stale_holds(janitor_grace).await {
                Ok(0) => {}
                Ok(swept) => info!(swept, "Janitor swept stale holds"),
                Err(e) => warn!(error = %e, "Janitor sweep failed"),
            }
        }
    });

    // Serve
    let app = routes::router(AppState::new(db, engine));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
