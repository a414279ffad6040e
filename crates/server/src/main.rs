use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kitchen_core::{load_config, validate_config, DispatchError, Dispatcher, SimulatedExecutor};
use kitchen_server::api::{create_router, spawn_event_forwarder, WsBroadcaster};
use kitchen_server::state::AppState;

/// Interval between WebSocket heartbeats
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("KITCHEN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!(
        workers = config.dispatcher.workers,
        permits = config.dispatcher.permit_capacity,
        execution_ms = config.dispatcher.execution_duration().as_millis() as u64,
        "Configuration loaded successfully"
    );

    // Start the dispatch engine
    let executor = SimulatedExecutor::from_units(
        config.dispatcher.execution_units,
        config.dispatcher.time_unit(),
    );
    let dispatcher = Arc::new(
        Dispatcher::start(config.dispatcher.clone(), Arc::new(executor))
            .context("Failed to start dispatcher")?,
    );

    // Relay stats events to WebSocket clients
    let ws_broadcaster = WsBroadcaster::new(config.dispatcher.event_buffer);
    let forwarder = spawn_event_forwarder(&dispatcher, ws_broadcaster.clone(), HEARTBEAT_INTERVAL);

    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&dispatcher),
        ws_broadcaster.clone(),
    ));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop the kitchen once no more orders can arrive
    info!("Server shutting down...");
    ws_broadcaster.dispatcher_status(false);
    match dispatcher.shutdown(config.dispatcher.shutdown_timeout()).await {
        Ok(report) => info!(
            dropped = report.dropped,
            drained = report.drained,
            "Dispatcher stopped"
        ),
        Err(DispatchError::ShutdownTimeout {
            dropped,
            drained,
            abandoned,
        }) => warn!(
            dropped,
            drained, abandoned, "Dispatcher stopped with orders still in flight"
        ),
        Err(e) => warn!("Dispatcher shutdown failed: {}", e),
    }

    let snapshot = dispatcher.snapshot();
    info!(
        received = snapshot.received,
        completed = snapshot.completed,
        failed = snapshot.failed,
        dropped = snapshot.dropped,
        "Final statistics"
    );

    forwarder.abort();
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
