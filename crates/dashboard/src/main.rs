//! Placement Dashboard - live view of multi-cloud placement telemetry
//!
//! Streams telemetry and placement decisions from the backend over a
//! WebSocket, falls back to polling, and fills in with synthetic demo data
//! when nothing live arrives. Frames are drawn on the terminal; operator
//! commands are read from stdin.

use anyhow::{Context, Result};
use dashboard_lib::{
    ClientMetrics, DeployRequestClient, HealthRegistry, StructuredLogger, SupervisorBuilder,
};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod console;
mod terminal;

const DASHBOARD_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr; stdout belongs to the terminal surface
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let config = config::DashboardConfig::load()?;
    let api_client = config.api_client()?;
    info!(instance = %config.instance, base_url = %api_client.base_url(), "Dashboard configured");

    let health_registry = HealthRegistry::new();
    health_registry.register_defaults().await;

    let metrics = ClientMetrics::new();
    let logger = StructuredLogger::new(&config.instance);
    logger.log_startup(DASHBOARD_VERSION, api_client.base_url().as_str());

    let transport = config.transport_config(&api_client)?;
    let backend = Arc::new(api_client);

    let (supervisor, handle) = SupervisorBuilder::new(transport)
        .api(backend.clone())
        .surface(Box::new(terminal::TerminalSurface::stdout(config.clear_screen)))
        .health(health_registry.clone())
        .logger(logger.clone())
        .metrics(metrics)
        .build()
        .context("failed to build transport supervisor")?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let supervisor_handle = tokio::spawn(supervisor.run(shutdown_tx.subscribe()));

    let app_state = Arc::new(api::AppState::new(health_registry, handle.clone()));
    let api_port = config.api_port;
    tokio::spawn(async move {
        if let Err(e) = api::serve(api_port, app_state).await {
            error!(error = %e, "API server stopped");
        }
    });

    let deploy = DeployRequestClient::new(backend, handle.clone(), logger.clone());
    let console = console::Console::new(deploy, handle);
    let stdin = BufReader::new(tokio::io::stdin());

    let reason = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for ctrl-c")?;
            "SIGINT received"
        }
        result = console.run(stdin) => {
            if result? {
                "quit requested"
            } else {
                // stdin closed (e.g. running detached); keep serving until signalled
                tokio::signal::ctrl_c()
                    .await
                    .context("failed to listen for ctrl-c")?;
                "SIGINT received"
            }
        }
    };

    info!(reason = %reason, "Shutting down");
    let _ = shutdown_tx.send(());
    supervisor_handle
        .await
        .context("supervisor task panicked")?;
    logger.log_shutdown(reason);

    Ok(())
}
