//! Analytics library for the load analytics service
//!
//! This crate provides the core functionality for:
//! - Sliding-window statistics over load samples
//! - Z-score anomaly detection
//! - Concurrency-safe ingestion and snapshot reads
//! - Pluggable sample storage
//! - Health checks and observability

pub mod analysis;
pub mod health;
pub mod models;
pub mod observability;
pub mod storage;

pub use analysis::{CoordinatorConfig, IngestionCoordinator, WindowAnalysis};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
    ServiceStatus,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use storage::{MemoryStore, SampleStore, StoreError};
