//! Z-score anomaly detection
//!
//! Flags a value whose distance from the window mean exceeds a fixed number
//! of standard deviations. The detector is stateless; callers supply the
//! statistics and the population size.

use super::WindowStats;

/// Minimum population before the detector activates
pub const MIN_SAMPLES_FOR_DETECTION: usize = 10;

/// Z-score above which a value is anomalous (strictly greater)
pub const Z_SCORE_THRESHOLD: f64 = 2.0;

/// Outcome of testing a single value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub is_anomaly: bool,
    /// `None` when the detector was dormant or the baseline had zero spread
    pub z_score: Option<f64>,
}

impl Detection {
    fn dormant() -> Self {
        Self {
            is_anomaly: false,
            z_score: None,
        }
    }
}

/// Stateless z-score predicate
#[derive(Debug, Clone, Copy)]
pub struct AnomalyDetector {
    /// Number of standard deviations considered anomalous
    pub threshold: f64,
    /// Population size below which nothing is flagged
    pub min_samples: usize,
}

impl AnomalyDetector {
    pub fn new(threshold: f64, min_samples: usize) -> Self {
        Self {
            threshold,
            min_samples,
        }
    }

    /// Test `candidate` against `stats` computed over `sample_count` values
    pub fn test(&self, candidate: f64, stats: &WindowStats, sample_count: usize) -> Detection {
        if sample_count < self.min_samples {
            return Detection::dormant();
        }

        match stats.z_score(candidate) {
            Some(z_score) => Detection {
                is_anomaly: z_score > self.threshold,
                z_score: Some(z_score),
            },
            None => Detection::dormant(),
        }
    }

    /// Convenience form of [`AnomalyDetector::test`]
    pub fn is_anomalous(&self, candidate: f64, stats: &WindowStats, sample_count: usize) -> bool {
        self.test(candidate, stats, sample_count).is_anomaly
    }

    /// Count the members of `values` that are anomalous against `stats`
    ///
    /// `stats` is expected to be computed over `values` itself.
    pub fn scan(&self, values: &[f64], stats: &WindowStats) -> usize {
        values
            .iter()
            .filter(|&&v| self.is_anomalous(v, stats, values.len()))
            .count()
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(Z_SCORE_THRESHOLD, MIN_SAMPLES_FOR_DETECTION)
    }
}
