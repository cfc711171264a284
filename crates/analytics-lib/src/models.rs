//! Core data models for the load analytics service

use serde::{Deserialize, Serialize};

/// Default `rps` applied when an ingestion payload omits the field entirely
pub const DEFAULT_RPS: f64 = 100.0;

/// A single load observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Unix seconds
    pub timestamp: i64,
    /// CPU utilization
    pub cpu: f64,
    /// Requests per second
    pub rps: f64,
}

impl Sample {
    pub fn new(timestamp: i64, cpu: f64, rps: f64) -> Self {
        Self { timestamp, cpu, rps }
    }
}

/// Ingestion payload as submitted by callers
///
/// Every field is optional on the wire. Use [`SampleInput::resolve`] to turn
/// it into a [`Sample`] with the documented defaults applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rps: Option<f64>,
}

/// Defaults applied when resolving a [`SampleInput`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputDefaults {
    /// Value used when `rps` is absent. `None` means an absent `rps` is read as `0.0`.
    pub rps: Option<f64>,
}

impl Default for InputDefaults {
    fn default() -> Self {
        Self {
            rps: Some(DEFAULT_RPS),
        }
    }
}

impl SampleInput {
    /// Apply defaults, using `now` for a missing or zero timestamp
    pub fn resolve(&self, defaults: InputDefaults, now: i64) -> Sample {
        let timestamp = match self.timestamp {
            Some(ts) if ts != 0 => ts,
            _ => now,
        };

        Sample {
            timestamp,
            cpu: self.cpu.unwrap_or(0.0),
            rps: self.rps.or(defaults.rps).unwrap_or(0.0),
        }
    }
}

/// Derived view of the window, recomputed on every mutation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    pub rolling_average: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub window_size: usize,
    pub anomaly_count_total: u64,
    /// Unix seconds of the last recomputation, `0` before the first sample
    pub last_updated_at: i64,
}

impl AnalysisSnapshot {
    /// Snapshot of an empty window
    pub fn empty() -> Self {
        Self {
            rolling_average: 0.0,
            std_dev: 0.0,
            min: 0.0,
            max: 0.0,
            window_size: 0,
            anomaly_count_total: 0,
            last_updated_at: 0,
        }
    }
}

impl Default for AnalysisSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Result of ingesting one sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub sample: Sample,
    pub is_anomaly: bool,
    /// Z-score of the sample when the detector was active and the baseline non-degenerate
    pub z_score: Option<f64>,
    pub snapshot: AnalysisSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_applies_rps_default() {
        let input: SampleInput = serde_json::from_str(r#"{"cpu": 42.0}"#).unwrap();
        let sample = input.resolve(InputDefaults::default(), 1_700_000_000);

        assert_eq!(sample.rps, DEFAULT_RPS);
        assert_eq!(sample.cpu, 42.0);
        assert_eq!(sample.timestamp, 1_700_000_000);
    }

    #[test]
    fn test_resolve_without_rps_default() {
        let input = SampleInput::default();
        let sample = input.resolve(InputDefaults { rps: None }, 10);
        assert_eq!(sample.rps, 0.0);
    }

    #[test]
    fn test_resolve_zero_timestamp_uses_now() {
        let input = SampleInput {
            timestamp: Some(0),
            cpu: None,
            rps: Some(5.0),
        };
        assert_eq!(input.resolve(InputDefaults::default(), 99).timestamp, 99);

        let explicit = SampleInput {
            timestamp: Some(1234),
            ..input
        };
        assert_eq!(explicit.resolve(InputDefaults::default(), 99).timestamp, 1234);
    }

    #[test]
    fn test_explicit_zero_rps_is_kept() {
        let input: SampleInput = serde_json::from_str(r#"{"rps": 0.0}"#).unwrap();
        assert_eq!(input.resolve(InputDefaults::default(), 1).rps, 0.0);
    }
}
