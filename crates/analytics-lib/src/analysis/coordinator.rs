//! Ingestion coordinator
//!
//! Owns the window, the cached snapshot and the anomaly counter behind a
//! single reader/writer lock. Ingestion and maintenance take the write side,
//! snapshot reads take the read side. Nothing inside the lock performs I/O.

use super::maintenance::{run_maintenance, RetentionPolicy, DEFAULT_MAINTENANCE_INTERVAL};
use super::window::DEFAULT_WINDOW_CAPACITY;
use super::{AnomalyDetector, MetricWindow, WindowStats};
use crate::models::{AnalysisSnapshot, IngestOutcome, Sample};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

/// Configuration for the ingestion coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Number of samples kept in the window
    pub window_capacity: usize,
    /// Interval between maintenance ticks
    pub maintenance_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            maintenance_interval: DEFAULT_MAINTENANCE_INTERVAL,
        }
    }
}

/// Snapshot plus the per-window anomaly scan, read under one lock
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowAnalysis {
    #[serde(flatten)]
    pub snapshot: AnalysisSnapshot,
    /// Window members currently more than the threshold away from the mean
    pub window_anomalies: usize,
}

struct CoordinatorState {
    window: MetricWindow,
    snapshot: AnalysisSnapshot,
    anomaly_count: u64,
}

impl CoordinatorState {
    fn refresh(&mut self, stats: &WindowStats, now: i64) {
        self.snapshot = AnalysisSnapshot {
            rolling_average: stats.mean,
            std_dev: stats.std_dev,
            min: stats.min,
            max: stats.max,
            window_size: self.window.len(),
            anomaly_count_total: self.anomaly_count,
            last_updated_at: now,
        };
    }
}

/// Serializes window mutation and serves consistent snapshots
pub struct IngestionCoordinator {
    state: RwLock<CoordinatorState>,
    detector: AnomalyDetector,
    config: CoordinatorConfig,
    shutdown_tx: broadcast::Sender<()>,
    stopped: AtomicBool,
    maintenance_started: AtomicBool,
}

impl IngestionCoordinator {
    /// Create a coordinator with an empty window
    ///
    /// # Panics
    /// Panics if `config.window_capacity` is zero.
    pub fn new(config: CoordinatorConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            state: RwLock::new(CoordinatorState {
                window: MetricWindow::new(config.window_capacity),
                snapshot: AnalysisSnapshot::empty(),
                anomaly_count: 0,
            }),
            detector: AnomalyDetector::default(),
            config,
            shutdown_tx,
            stopped: AtomicBool::new(false),
            maintenance_started: AtomicBool::new(false),
        }
    }

    pub fn with_capacity(window_capacity: usize) -> Self {
        Self::new(CoordinatorConfig {
            window_capacity,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Ingest one sample
    ///
    /// Appends to the window, recomputes statistics over the post-append
    /// window and tests the sample against them. The sample is part of its
    /// own baseline.
    pub fn process_sample(&self, sample: Sample) -> IngestOutcome {
        let mut state = self.write_state();
        // Read under the lock so last_updated_at follows lock order
        let now = chrono::Utc::now().timestamp();

        state.window.append(sample);
        let values = state.window.rps_values();
        let stats = WindowStats::compute(&values);
        let detection = self.detector.test(sample.rps, &stats, values.len());

        if detection.is_anomaly {
            state.anomaly_count += 1;
        }
        state.refresh(&stats, now);

        IngestOutcome {
            sample,
            is_anomaly: detection.is_anomaly,
            z_score: detection.z_score,
            snapshot: state.snapshot,
        }
    }

    /// Copy of the current snapshot
    pub fn snapshot(&self) -> AnalysisSnapshot {
        self.read_state().snapshot
    }

    /// Snapshot together with a scan of the current window
    pub fn analyze(&self) -> WindowAnalysis {
        let state = self.read_state();
        let values = state.window.rps_values();
        let stats = WindowStats::compute(&values);

        WindowAnalysis {
            snapshot: state.snapshot,
            window_anomalies: self.detector.scan(&values, &stats),
        }
    }

    /// Ordered copy of the window contents
    pub fn window(&self) -> Vec<Sample> {
        self.read_state().window.snapshot()
    }

    /// Apply a retention policy to the window, returning how many samples it dropped
    ///
    /// The snapshot is recomputed only when the window changed. The anomaly
    /// counter is never touched.
    pub fn apply_retention(&self, policy: &dyn RetentionPolicy) -> usize {
        let mut state = self.write_state();
        let before = state.window.snapshot();
        let before_len = before.len();

        let retained = policy.apply(before.clone());
        if retained == before {
            return 0;
        }

        state.window.replace(retained);
        let stats = WindowStats::compute(&state.window.rps_values());
        state.refresh(&stats, chrono::Utc::now().timestamp());

        debug!(
            before = before_len,
            after = state.window.len(),
            "Retention policy changed the window"
        );
        before_len.saturating_sub(state.window.len())
    }

    /// Spawn the periodic maintenance task
    ///
    /// Returns `None` if maintenance was already started. The task exits on
    /// [`IngestionCoordinator::stop`].
    pub fn start_maintenance(
        self: &Arc<Self>,
        policy: Arc<dyn RetentionPolicy>,
    ) -> Option<JoinHandle<()>> {
        if self.maintenance_started.swap(true, Ordering::SeqCst) {
            return None;
        }

        // Subscribe before checking the flag so a concurrent stop is never missed
        let shutdown = self.shutdown_tx.subscribe();
        if self.is_stopped() {
            return Some(tokio::spawn(async {}));
        }

        Some(tokio::spawn(run_maintenance(
            Arc::clone(self),
            policy,
            self.config.maintenance_interval,
            shutdown,
        )))
    }

    /// Signal the maintenance task to terminate
    ///
    /// Safe to call any number of times; returns `true` only for the call
    /// that actually stopped it.
    pub fn stop(&self) -> bool {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return false;
        }
        // No receivers simply means maintenance was never started
        let _ = self.shutdown_tx.send(());
        true
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, CoordinatorState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CoordinatorState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for IngestionCoordinator {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::KeepAll;

    fn rps(value: f64) -> Sample {
        Sample::new(1_700_000_000, 10.0, value)
    }

    #[test]
    fn test_empty_snapshot() {
        let coordinator = IngestionCoordinator::default();
        let snapshot = coordinator.snapshot();

        assert_eq!(snapshot, AnalysisSnapshot::empty());
        assert_eq!(coordinator.analyze().window_anomalies, 0);
    }

    #[test]
    fn test_process_sample_updates_snapshot() {
        let coordinator = IngestionCoordinator::with_capacity(5);
        coordinator.process_sample(rps(10.0));
        let outcome = coordinator.process_sample(rps(20.0));

        assert!(!outcome.is_anomaly);
        assert_eq!(outcome.snapshot.rolling_average, 15.0);
        assert_eq!(outcome.snapshot.std_dev, 5.0);
        assert_eq!(outcome.snapshot.min, 10.0);
        assert_eq!(outcome.snapshot.max, 20.0);
        assert_eq!(outcome.snapshot.window_size, 2);
        assert!(outcome.snapshot.last_updated_at > 0);
        assert_eq!(coordinator.snapshot(), outcome.snapshot);
    }

    #[test]
    fn test_snapshot_reads_are_identical() {
        let coordinator = IngestionCoordinator::default();
        for v in [1.0, 2.5, 7.25] {
            coordinator.process_sample(rps(v));
        }

        let a = coordinator.snapshot();
        let b = coordinator.snapshot();
        assert_eq!(a.rolling_average.to_bits(), b.rolling_average.to_bits());
        assert_eq!(a.std_dev.to_bits(), b.std_dev.to_bits());
        assert_eq!(a, b);
    }

    #[test]
    fn test_outlier_counted_once_detector_is_active() {
        let coordinator = IngestionCoordinator::default();
        for i in 0..12 {
            coordinator.process_sample(rps(100.0 + (i % 3) as f64));
        }

        let outcome = coordinator.process_sample(rps(1_000.0));
        assert!(outcome.is_anomaly);
        assert!(outcome.z_score.unwrap() > 2.0);
        assert_eq!(outcome.snapshot.anomaly_count_total, 1);
        assert_eq!(coordinator.snapshot().anomaly_count_total, 1);
    }

    #[test]
    fn test_equal_values_never_flag() {
        let coordinator = IngestionCoordinator::default();
        for _ in 0..30 {
            let outcome = coordinator.process_sample(rps(50.0));
            assert!(!outcome.is_anomaly);
            assert!(outcome.z_score.is_none());
        }

        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot.std_dev, 0.0);
        assert_eq!(snapshot.anomaly_count_total, 0);
    }

    #[test]
    fn test_candidate_is_part_of_its_own_baseline() {
        // Nine equal values then one distinct value: the baseline includes
        // the candidate, so its z-score is sqrt(n - 1) = 3.
        let coordinator = IngestionCoordinator::default();
        for _ in 0..9 {
            coordinator.process_sample(rps(50.0));
        }

        let outcome = coordinator.process_sample(rps(80.0));
        assert_eq!(outcome.snapshot.rolling_average, 53.0);
        assert_eq!(outcome.snapshot.std_dev, 9.0);
        assert!((outcome.z_score.unwrap() - 3.0).abs() < 1e-12);
        assert!(outcome.is_anomaly);
    }

    #[test]
    fn test_retention_identity_leaves_snapshot_untouched() {
        let coordinator = IngestionCoordinator::default();
        coordinator.process_sample(rps(1.0));
        let before = coordinator.snapshot();

        assert_eq!(coordinator.apply_retention(&KeepAll), 0);
        assert_eq!(coordinator.snapshot(), before);
    }

    #[test]
    fn test_retention_trim_recomputes_but_keeps_counter() {
        let coordinator = IngestionCoordinator::with_capacity(20);
        for i in 0..15 {
            coordinator.process_sample(Sample::new(i, 0.0, 10.0 + (i % 2) as f64));
        }
        coordinator.process_sample(Sample::new(15, 0.0, 500.0));
        assert_eq!(coordinator.snapshot().anomaly_count_total, 1);

        let drop_outlier =
            |w: Vec<Sample>| w.into_iter().filter(|s| s.rps < 100.0).collect::<Vec<_>>();
        assert_eq!(coordinator.apply_retention(&drop_outlier), 1);

        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot.window_size, 15);
        assert_eq!(snapshot.max, 11.0);
        assert_eq!(snapshot.anomaly_count_total, 1);
    }

    #[test]
    fn test_retention_output_is_clamped_to_capacity() {
        let coordinator = IngestionCoordinator::with_capacity(3);
        coordinator.process_sample(rps(1.0));

        let inflate = |_: Vec<Sample>| (0..10).map(|i| Sample::new(i, 0.0, i as f64)).collect::<Vec<_>>();
        coordinator.apply_retention(&inflate);

        let window = coordinator.window();
        assert_eq!(window.len(), 3);
        assert_eq!(window[2].rps, 9.0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let coordinator = IngestionCoordinator::default();
        assert!(coordinator.stop());
        assert!(!coordinator.stop());
        assert!(!coordinator.stop());
        assert!(coordinator.is_stopped());
    }

    #[tokio::test]
    async fn test_start_maintenance_only_once() {
        let coordinator = Arc::new(IngestionCoordinator::default());
        let handle = coordinator.start_maintenance(Arc::new(KeepAll));
        assert!(handle.is_some());
        assert!(coordinator.start_maintenance(Arc::new(KeepAll)).is_none());

        coordinator.stop();
        handle.unwrap().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_after_stop_exits_immediately() {
        let coordinator = Arc::new(IngestionCoordinator::default());
        coordinator.stop();

        let handle = coordinator.start_maintenance(Arc::new(KeepAll)).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("maintenance task should exit")
            .unwrap();
    }
}
