//! Load Service - sliding-window load analytics
//!
//! Accepts load samples over HTTP, keeps rolling statistics over the most
//! recent window and flags anomalous samples.

use analytics_lib::{
    health::{components, HealthRegistry},
    observability::{ServiceMetrics, StructuredLogger},
    storage::{MemoryStore, SampleStore},
    IngestionCoordinator,
};
use anyhow::{Context, Result};
use load_service::{api, config::ServiceConfig, supervisor};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting load-service");

    let config = ServiceConfig::load().context("Failed to load configuration")?;
    info!(
        service = %config.service_name,
        window_capacity = config.window_capacity,
        maintenance_interval_secs = config.maintenance_interval_secs,
        default_rps = config.default_rps,
        "Service configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::STORAGE).await;
    health_registry.register(components::MAINTENANCE).await;

    let metrics = ServiceMetrics::new();
    let logger = StructuredLogger::new(&config.service_name);
    logger.log_startup(SERVICE_VERSION, config.window_capacity, config.port);

    let coordinator = Arc::new(IngestionCoordinator::new(config.coordinator_config()));
    let maintenance = coordinator
        .start_maintenance(config.retention_policy())
        .map(|handle| {
            tokio::spawn(supervisor::watch_maintenance(
                handle,
                coordinator.clone(),
                health_registry.clone(),
            ))
        });

    let store: Arc<dyn SampleStore> = Arc::new(MemoryStore::new(config.store_capacity));

    let app_state = Arc::new(
        api::AppState::new(
            coordinator.clone(),
            store,
            health_registry.clone(),
            metrics,
            &config.service_name,
        )
        .with_input_defaults(config.input_defaults()),
    );

    health_registry.set_ready(true).await;

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(api::serve(config.port, app_state, async {
        let _ = stop_rx.await;
    }));

    tokio::select! {
        reason = shutdown_signal() => {
            logger.log_shutdown(reason);
        }
        result = &mut server => {
            coordinator.stop();
            return result.context("API server task failed")?;
        }
    }

    health_registry.set_ready(false).await;
    let _ = stop_tx.send(());
    coordinator.stop();

    match tokio::time::timeout(config.shutdown_grace(), server).await {
        Ok(result) => result.context("API server task failed")??,
        Err(_) => warn!(
            grace_secs = config.shutdown_grace_secs,
            "Grace period elapsed with requests still in flight"
        ),
    }

    if let Some(watcher) = maintenance {
        match watcher.await {
            Ok(true) => {}
            Ok(false) => warn!("Maintenance task ended before shutdown"),
            Err(e) => warn!(error = %e, "Maintenance watcher failed"),
        }
    }

    info!("Shut down");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT received",
        _ = terminate => "SIGTERM received",
    }
}
