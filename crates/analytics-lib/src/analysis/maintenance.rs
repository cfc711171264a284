//! Periodic window maintenance
//!
//! A retention policy is applied to the window on a fixed interval. The
//! default policy keeps everything; [`MaxAge`] drops samples older than a
//! configured age.

use super::IngestionCoordinator;
use crate::models::Sample;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info};

/// Default interval between maintenance ticks
pub const DEFAULT_MAINTENANCE_INTERVAL: Duration = Duration::from_secs(30);

/// Policy applied to the window on each maintenance tick
///
/// Receives the window contents in arrival order and returns the samples to
/// keep. Returning the input unchanged leaves the window untouched.
pub trait RetentionPolicy: Send + Sync {
    fn apply(&self, window: Vec<Sample>) -> Vec<Sample>;

    /// Name used in logs
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> RetentionPolicy for F
where
    F: Fn(Vec<Sample>) -> Vec<Sample> + Send + Sync,
{
    fn apply(&self, window: Vec<Sample>) -> Vec<Sample> {
        self(window)
    }
}

/// Identity policy
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAll;

impl RetentionPolicy for KeepAll {
    fn apply(&self, window: Vec<Sample>) -> Vec<Sample> {
        window
    }

    fn name(&self) -> &str {
        "keep_all"
    }
}

/// Drops samples whose timestamp is older than `max_age` relative to now
#[derive(Debug, Clone, Copy)]
pub struct MaxAge {
    pub max_age: Duration,
}

impl MaxAge {
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    /// Apply against an explicit "now" in unix seconds
    pub fn apply_at(&self, window: Vec<Sample>, now: i64) -> Vec<Sample> {
        // Ages beyond i64 seconds saturate to "keep everything"
        let age = i64::try_from(self.max_age.as_secs()).unwrap_or(i64::MAX);
        let cutoff = now.saturating_sub(age);
        window.into_iter().filter(|s| s.timestamp >= cutoff).collect()
    }
}

impl RetentionPolicy for MaxAge {
    fn apply(&self, window: Vec<Sample>) -> Vec<Sample> {
        self.apply_at(window, chrono::Utc::now().timestamp())
    }

    fn name(&self) -> &str {
        "max_age"
    }
}

/// Run maintenance ticks until a shutdown signal arrives
///
/// The first tick fires one full `period` after start.
pub async fn run_maintenance(
    coordinator: Arc<IngestionCoordinator>,
    policy: Arc<dyn RetentionPolicy>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    info!(
        interval_secs = period.as_secs(),
        policy = policy.name(),
        "Starting window maintenance"
    );

    let mut ticker = interval_at(Instant::now() + period, period);
    let mut ticks = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                ticks += 1;
                let removed = coordinator.apply_retention(policy.as_ref());
                if removed > 0 {
                    info!(event = "window_pruned", removed, policy = policy.name(), "Pruned window");
                } else {
                    debug!(tick = ticks, "Maintenance tick, window unchanged");
                }
            }
            _ = shutdown.recv() => {
                info!(ticks, "Stopping window maintenance");
                break;
            }
        }
    }
}
