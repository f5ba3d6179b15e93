// Financials API - Web Server
// REST API for tasks, revenues and expenses over a SQLite document store

use anyhow::{Context, Result};
use clap::Parser;
use financials::{app, AppState, Config, SqliteStore};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(config.log_json);

    info!(version = financials::VERSION, "Initializing server");

    // Open database
    info!(database = %config.database, "Attempting to connect to database");
    let store = match SqliteStore::connect(&config.database) {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "Database connection error");
            std::process::exit(1);
        }
    };
    info!(name = store.database_name(), "Database connected");

    // Create shared state
    let state = AppState::new(Arc::new(store));

    // Start server
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "Server running");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}
