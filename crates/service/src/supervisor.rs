//! Background task supervision
//!
//! Reports the maintenance task's exit into the health registry so a task
//! that dies early shows up on `/healthz`.

use analytics_lib::{
    health::{components, HealthRegistry},
    IngestionCoordinator,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Await the maintenance task and record how it ended
///
/// Returns `true` when the task exited because the coordinator was stopped.
/// A panic, or an exit before `stop()`, marks the maintenance component
/// unhealthy.
pub async fn watch_maintenance(
    handle: JoinHandle<()>,
    coordinator: Arc<IngestionCoordinator>,
    health_registry: HealthRegistry,
) -> bool {
    let failure = match handle.await {
        Ok(()) if coordinator.is_stopped() => None,
        Ok(()) => Some("maintenance task exited before shutdown".to_string()),
        Err(e) => Some(format!("maintenance task failed: {}", e)),
    };

    match failure {
        None => {
            debug!("Maintenance task stopped");
            true
        }
        Some(message) => {
            error!(error = %message, "Window maintenance is no longer running");
            health_registry
                .set_unhealthy(components::MAINTENANCE, message)
                .await;
            false
        }
    }
}
