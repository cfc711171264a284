//! Sliding-window load analysis
//!
//! This module provides:
//! - A bounded FIFO window of recent samples
//! - Population statistics over the window
//! - Z-score anomaly detection
//! - A coordinator that serializes ingestion and serves snapshots
//! - Periodic window maintenance with pluggable retention

mod coordinator;
mod detector;
mod maintenance;
mod stats;
mod window;


pub use coordinator::{CoordinatorConfig, IngestionCoordinator, WindowAnalysis};
pub use detector::{AnomalyDetector, Detection, MIN_SAMPLES_FOR_DETECTION, Z_SCORE_THRESHOLD};
pub use maintenance::{
    run_maintenance, KeepAll, MaxAge, RetentionPolicy, DEFAULT_MAINTENANCE_INTERVAL,
};
pub use stats::WindowStats;
pub use window::{MetricWindow, DEFAULT_WINDOW_CAPACITY};
