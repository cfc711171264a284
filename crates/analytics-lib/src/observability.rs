//! Observability infrastructure for the load analytics service
//!
//! Provides:
//! - Prometheus metrics (ingestion latency, sample and anomaly totals, window gauges)
//! - Structured JSON logging with tracing

use crate::models::{AnalysisSnapshot, IngestOutcome};
use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_gauge, Gauge,
    Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for ingestion latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    ingest_latency_seconds: Histogram,
    samples_ingested: IntCounter,
    anomalies_detected: IntCounter,
    store_errors: IntCounter,
    rolling_average: Gauge,
    std_dev: Gauge,
    window_size: IntGauge,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            ingest_latency_seconds: register_histogram!(
                "load_service_ingest_latency_seconds",
                "Time spent processing a single sample",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register ingest_latency_seconds"),

            samples_ingested: register_int_counter!(
                "load_service_samples_ingested_total",
                "Total number of samples ingested"
            )
            .expect("Failed to register samples_ingested"),

            anomalies_detected: register_int_counter!(
                "load_service_anomalies_detected_total",
                "Total number of samples flagged as anomalous"
            )
            .expect("Failed to register anomalies_detected"),

            store_errors: register_int_counter!(
                "load_service_store_errors_total",
                "Total number of failed sample store attempts"
            )
            .expect("Failed to register store_errors"),

            rolling_average: register_gauge!(
                "load_service_rolling_average_rps",
                "Mean rps over the current window"
            )
            .expect("Failed to register rolling_average"),

            std_dev: register_gauge!(
                "load_service_std_dev_rps",
                "Population standard deviation of rps over the current window"
            )
            .expect("Failed to register std_dev"),

            window_size: register_int_gauge!(
                "load_service_window_size",
                "Number of samples currently in the window"
            )
            .expect("Failed to register window_size"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_ingest_latency(&self, duration_secs: f64) {
        self.inner().ingest_latency_seconds.observe(duration_secs);
    }

    /// Record the result of one ingestion
    pub fn record_ingest(&self, outcome: &IngestOutcome) {
        self.inner().samples_ingested.inc();
        if outcome.is_anomaly {
            self.inner().anomalies_detected.inc();
        }
        self.set_snapshot(&outcome.snapshot);
    }

    /// Mirror the snapshot into the window gauges
    pub fn set_snapshot(&self, snapshot: &AnalysisSnapshot) {
        self.inner().rolling_average.set(snapshot.rolling_average);
        self.inner().std_dev.set(snapshot.std_dev);
        self.inner().window_size.set(snapshot.window_size as i64);
    }

    pub fn inc_store_errors(&self) {
        self.inner().store_errors.inc();
    }

    pub fn samples_ingested(&self) -> u64 {
        self.inner().samples_ingested.get()
    }

    pub fn store_errors(&self) -> u64 {
        self.inner().store_errors.get()
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, window_capacity: usize, port: u16) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            window_capacity = window_capacity,
            port = port,
            "Load analytics service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Load analytics service shutting down"
        );
    }

    pub fn log_ingest(&self, outcome: &IngestOutcome) {
        debug!(
            event = "sample_ingested",
            service = %self.service,
            timestamp = outcome.sample.timestamp,
            cpu = outcome.sample.cpu,
            rps = outcome.sample.rps,
            window = outcome.snapshot.window_size,
            rolling_average = outcome.snapshot.rolling_average,
            "Sample ingested"
        );

        if outcome.is_anomaly {
            self.log_anomaly(outcome);
        }
    }

    pub fn log_anomaly(&self, outcome: &IngestOutcome) {
        warn!(
            event = "anomaly_detected",
            service = %self.service,
            timestamp = outcome.sample.timestamp,
            cpu = outcome.sample.cpu,
            rps = outcome.sample.rps,
            z_score = ?outcome.z_score,
            rolling_average = outcome.snapshot.rolling_average,
            std_dev = outcome.snapshot.std_dev,
            anomaly_count_total = outcome.snapshot.anomaly_count_total,
            "Anomalous sample detected"
        );
    }

    pub fn log_store_failure(&self, backend: &str, error: &dyn std::error::Error) {
        warn!(
            event = "store_failed",
            service = %self.service,
            backend = %backend,
            error = %error,
            "Failed to persist sample, analysis unaffected"
        );
    }

    pub fn log_store_recovered(&self, backend: &str) {
        info!(
            event = "store_recovered",
            service = %self.service,
            backend = %backend,
            "Sample store recovered"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sample;

    #[test]
    fn test_service_metrics_recording() {
        let metrics = ServiceMetrics::new();
        let before = metrics.samples_ingested();

        let outcome = IngestOutcome {
            sample: Sample::new(1, 2.0, 3.0),
            is_anomaly: true,
            z_score: Some(2.5),
            snapshot: AnalysisSnapshot {
                window_size: 12,
                ..AnalysisSnapshot::empty()
            },
        };
        metrics.observe_ingest_latency(0.0001);
        metrics.record_ingest(&outcome);
        metrics.inc_store_errors();

        assert!(metrics.samples_ingested() > before);
        assert!(metrics.store_errors() >= 1);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-service");
        assert_eq!(logger.service, "test-service");
    }
}
