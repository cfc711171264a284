//! Load generator
//!
//! Fires random samples at `POST /metric` from a pool of concurrent workers
//! and reports latency and failure thresholds.

use anyhow::Result;
use colored::Colorize;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::client::{ApiClient, SampleRequest};
use crate::output::{print_error, print_info, print_json, print_success, print_warning, OutputFormat};

/// Upper bound (exclusive) of generated rps values
const MAX_RPS: f64 = 200.0;

/// Upper bound (exclusive) of generated cpu values
const MAX_CPU: f64 = 100.0;

/// Maximum tolerated failure rate
const MAX_FAILURE_RATE: f64 = 0.01;

/// Maximum tolerated p95 latency
const MAX_P95_MS: f64 = 500.0;

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub requests: usize,
    pub concurrency: usize,
    /// Sleep between requests of a single worker
    pub pause: Duration,
    pub verbose: bool,
}

#[derive(Debug, Default)]
struct WorkerResult {
    latencies_ms: Vec<f64>,
    failed: usize,
    anomalies: usize,
    not_stored: usize,
    /// Rolling average from this worker's latest response, keyed by completion order
    last_average: Option<(usize, f64)>,
}

/// Summary of a load run
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub requests: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub anomalies: usize,
    pub not_stored: usize,
    pub elapsed_secs: f64,
    pub throughput: f64,
    pub mean_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
    pub final_rolling_average: Option<f64>,
}

impl LoadReport {
    fn from_results(results: Vec<WorkerResult>, elapsed: Duration) -> Self {
        let mut latencies = Vec::new();
        let mut failed = 0;
        let mut anomalies = 0;
        let mut not_stored = 0;
        let mut final_rolling_average = None;

        for result in results {
            latencies.extend(result.latencies_ms);
            failed += result.failed;
            anomalies += result.anomalies;
            not_stored += result.not_stored;
            final_rolling_average = match (final_rolling_average, result.last_average) {
                (Some((seen, _)), Some((order, avg))) if order > seen => Some((order, avg)),
                (None, latest) => latest,
                (current, _) => current,
            };
        }
        latencies.sort_by(|a, b| a.total_cmp(b));

        let succeeded = latencies.len();
        let requests = succeeded + failed;
        let elapsed_secs = elapsed.as_secs_f64();
        let mean_ms = if succeeded > 0 {
            latencies.iter().sum::<f64>() / succeeded as f64
        } else {
            0.0
        };

        Self {
            requests,
            succeeded,
            failed,
            anomalies,
            not_stored,
            elapsed_secs,
            throughput: if elapsed_secs > 0.0 {
                requests as f64 / elapsed_secs
            } else {
                0.0
            },
            mean_ms,
            p95_ms: percentile(&latencies, 0.95),
            max_ms: latencies.last().copied().unwrap_or(0.0),
            final_rolling_average: final_rolling_average.map(|(_, avg)| avg),
        }
    }

    pub fn failure_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.failed as f64 / self.requests as f64
        }
    }

    /// Failure rate below 1% and p95 under 500ms
    pub fn thresholds_met(&self) -> bool {
        self.failure_rate() < MAX_FAILURE_RATE && self.p95_ms < MAX_P95_MS
    }
}

/// Nearest-rank percentile over sorted values
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// A sample with uniformly random load stamped with the current time
pub fn random_sample<R: Rng>(rng: &mut R) -> SampleRequest {
    SampleRequest {
        timestamp: Some(chrono::Utc::now().timestamp()),
        cpu: Some(rng.gen_range(0.0..MAX_CPU)),
        rps: Some(rng.gen_range(0.0..MAX_RPS)),
    }
}

async fn worker(
    client: ApiClient,
    next: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
    options: LoadOptions,
) -> WorkerResult {
    let mut rng = StdRng::from_entropy();
    let mut result = WorkerResult::default();

    while next.fetch_add(1, Ordering::Relaxed) < options.requests {
        let sample = random_sample(&mut rng);
        let start = Instant::now();

        match client.send_sample(&sample).await {
            Ok(response) => {
                result
                    .latencies_ms
                    .push(start.elapsed().as_secs_f64() * 1000.0);
                if response.is_anomaly {
                    result.anomalies += 1;
                }
                if !response.stored {
                    result.not_stored += 1;
                }
                let order = completed.fetch_add(1, Ordering::SeqCst);
                result.last_average = Some((order, response.rolling_average));
            }
            Err(e) => {
                result.failed += 1;
                if options.verbose {
                    print_error(&format!("{:#}", e));
                }
            }
        }

        if !options.pause.is_zero() {
            tokio::time::sleep(options.pause).await;
        }
    }

    result
}

/// Send `options.requests` samples across `options.concurrency` workers
pub async fn generate(client: &ApiClient, options: LoadOptions) -> Result<LoadReport> {
    anyhow::ensure!(options.concurrency > 0, "concurrency must be at least 1");

    let next = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..options.concurrency)
        .map(|_| {
            tokio::spawn(worker(
                client.clone(),
                next.clone(),
                completed.clone(),
                options.clone(),
            ))
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await?);
    }

    Ok(LoadReport::from_results(results, start.elapsed()))
}

/// Run a load test and print the report
pub async fn run_load_test(
    client: &ApiClient,
    options: LoadOptions,
    format: OutputFormat,
) -> Result<()> {
    if matches!(format, OutputFormat::Table) {
        print_info(&format!(
            "Sending {} samples with {} workers ({}ms pause)",
            options.requests,
            options.concurrency,
            options.pause.as_millis()
        ));
    }

    let report = generate(client, options).await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!();
            println!("{}", "Load Test Report".bold());
            println!("{}", "=".repeat(50));
            println!(
                "Requests:               {} ({} ok, {} failed)",
                report.requests, report.succeeded, report.failed
            );
            println!("Elapsed:                {:.2}s", report.elapsed_secs);
            println!("Throughput:             {:.1} req/s", report.throughput);
            println!("Latency mean:           {:.1}ms", report.mean_ms);
            println!("Latency p95:            {:.1}ms", report.p95_ms);
            println!("Latency max:            {:.1}ms", report.max_ms);
            println!("Anomalies flagged:      {}", report.anomalies);
            if let Some(avg) = report.final_rolling_average {
                println!("Final rolling average:  {:.2}", avg);
            }
            println!();

            if report.not_stored > 0 {
                print_warning(&format!(
                    "{} samples were analysed but not persisted",
                    report.not_stored
                ));
            }
        }
    }

    if report.thresholds_met() {
        if matches!(format, OutputFormat::Table) {
            print_success("Thresholds met (failures < 1%, p95 < 500ms)");
        }
        Ok(())
    } else {
        anyhow::bail!(
            "thresholds not met: failure rate {:.2}%, p95 {:.1}ms",
            report.failure_rate() * 100.0,
            report.p95_ms
        )
    }
}
