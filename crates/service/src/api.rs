//! HTTP API: sample ingestion, analysis, health checks and Prometheus metrics

use crate::error::ApiError;
use analytics_lib::{
    analysis::{IngestionCoordinator, WindowAnalysis, Z_SCORE_THRESHOLD},
    health::{components, ComponentStatus, HealthRegistry},
    models::{InputDefaults, Sample, SampleInput},
    observability::{ServiceMetrics, StructuredLogger},
    storage::SampleStore,
};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Default number of samples returned by `/samples/recent`
const DEFAULT_RECENT_LIMIT: usize = 10;

/// Upper bound on `/samples/recent?limit=`
const MAX_RECENT_LIMIT: usize = 1000;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<IngestionCoordinator>,
    pub store: Arc<dyn SampleStore>,
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
    pub input_defaults: InputDefaults,
    pub service_name: String,
    pub version: String,
}

impl AppState {
    pub fn new(
        coordinator: Arc<IngestionCoordinator>,
        store: Arc<dyn SampleStore>,
        health_registry: HealthRegistry,
        metrics: ServiceMetrics,
        service_name: impl Into<String>,
    ) -> Self {
        let service_name = service_name.into();
        Self {
            coordinator,
            store,
            health_registry,
            metrics,
            logger: StructuredLogger::new(service_name.clone()),
            input_defaults: InputDefaults::default(),
            service_name,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_input_defaults(mut self, input_defaults: InputDefaults) -> Self {
        self.input_defaults = input_defaults;
        self
    }

    /// Persist a sample, tracking storage health; never fails the request
    async fn persist(&self, sample: &Sample) -> bool {
        match self.store.store(sample).await {
            Ok(()) => {
                let previous = self.health_registry.status_of(components::STORAGE).await;
                if matches!(previous, Some(status) if status != ComponentStatus::Healthy) {
                    self.health_registry.set_healthy(components::STORAGE).await;
                    self.logger.log_store_recovered(self.store.name());
                }
                true
            }
            Err(e) => {
                self.metrics.inc_store_errors();
                self.logger.log_store_failure(self.store.name(), &e);
                self.health_registry
                    .set_degraded(components::STORAGE, e.to_string())
                    .await;
                false
            }
        }
    }
}

/// Response to `POST /metric`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub id: String,
    pub status: String,
    pub rps: f64,
    pub rolling_average: f64,
    pub is_anomaly: bool,
    pub window: usize,
    /// Whether the sample reached the store
    pub stored: bool,
    pub received_at: String,
}

/// Response to `GET /analyze`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(flatten)]
    pub analysis: WindowAnalysis,
    pub window_capacity: usize,
    pub algorithm: String,
    pub timestamp: String,
}

/// Response to `GET /samples/recent`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentResponse {
    pub backend: String,
    pub samples: Vec<Sample>,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

/// Submit a sample
async fn ingest(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SampleInput>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let Json(input) = payload.map_err(|rejection| ApiError::InvalidJson(rejection.body_text()))?;
    let now = chrono::Utc::now();
    let sample = input.resolve(state.input_defaults, now.timestamp());

    if !sample.cpu.is_finite() || !sample.rps.is_finite() {
        return Err(ApiError::BadRequest("cpu and rps must be finite".into()));
    }

    let stored = state.persist(&sample).await;

    let start = Instant::now();
    let outcome = state.coordinator.process_sample(sample);
    state
        .metrics
        .observe_ingest_latency(start.elapsed().as_secs_f64());
    state.metrics.record_ingest(&outcome);
    state.logger.log_ingest(&outcome);

    Ok(Json(IngestResponse {
        id: format!("metric_{}", sample.timestamp),
        status: "processed".to_string(),
        rps: sample.rps,
        rolling_average: outcome.snapshot.rolling_average,
        is_anomaly: outcome.is_anomaly,
        window: outcome.snapshot.window_size,
        stored,
        received_at: now.to_rfc3339(),
    }))
}

/// Current analysis of the window
async fn analyze(State(state): State<Arc<AppState>>) -> Json<AnalyzeResponse> {
    let analysis = state.coordinator.analyze();

    Json(AnalyzeResponse {
        analysis,
        window_capacity: state.coordinator.config().window_capacity,
        algorithm: format!("z-score (threshold > {}σ)", Z_SCORE_THRESHOLD),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Most recent samples from the store
async fn recent(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<RecentResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .min(MAX_RECENT_LIMIT);
    let samples = state.store.fetch_recent(limit).await?;

    Ok(Json(RecentResponse {
        backend: state.store.name().to_string(),
        samples,
    }))
}

/// Service summary
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(
        state
            .health_registry
            .summary(&state.service_name, &state.version)
            .await,
    )
}

/// Health check response - returns 200 if healthy, 503 if degraded/unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = if health.status.is_operational() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

/// Plain-text endpoint listing
async fn root(State(state): State<Arc<AppState>>) -> String {
    format!(
        "{name} v{version}\n\n\
         Endpoints:\n  \
         POST /metric          - Submit a sample (JSON: timestamp, cpu, rps)\n  \
         GET  /analyze         - Rolling statistics and anomaly counts\n  \
         GET  /samples/recent  - Recently stored samples\n  \
         GET  /health          - Service summary\n  \
         GET  /healthz         - Component health\n  \
         GET  /readyz          - Readiness\n  \
         GET  /metrics         - Prometheus metrics\n\n\
         Features:\n  \
         - Rolling average with window size {capacity}\n  \
         - Anomaly detection using z-score (threshold > {threshold}σ)\n",
        name = state.service_name,
        version = state.version,
        capacity = state.coordinator.config().window_capacity,
        threshold = Z_SCORE_THRESHOLD,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/metric", post(ingest))
        .route("/analyze", get(analyze))
        .route("/samples/recent", get(recent))
        .route("/health", get(health))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server, returning once `shutdown` resolves and connections drain
pub async fn serve<F>(port: u16, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
