//! Window statistics
//!
//! Population statistics over the `rps` values of a window snapshot. The
//! computation is pure and deterministic: the mean is accumulated in a single
//! left-to-right pass and the variance in a second pass over squared values.

use serde::{Deserialize, Serialize};

/// Statistics over a window snapshot
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindowStats {
    pub mean: f64,
    /// Population variance (divides by `n`)
    pub variance: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl WindowStats {
    /// Compute statistics over `values`, in order
    ///
    /// An empty slice yields all zeros.
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;

        let mut sum: f64 = 0.0;
        for v in values {
            sum += v;
        }
        let mean = sum / n;

        let mut sq_sum: f64 = 0.0;
        for v in values {
            sq_sum += v * v;
        }

        let (min, max) = min_max(values);

        // Identical values have no spread; cancellation in E[v²] - mean² can
        // otherwise leave a residue of either sign.
        let variance = if min == max {
            0.0
        } else {
            (sq_sum / n) - (mean * mean)
        };
        let std_dev = variance.max(0.0).sqrt();

        Self {
            mean,
            variance,
            std_dev,
            min,
            max,
            count: values.len(),
        }
    }

    /// Z-score of `value`, or `None` for a degenerate (zero spread) distribution
    pub fn z_score(&self, value: f64) -> Option<f64> {
        if self.std_dev == 0.0 {
            return None;
        }
        Some((value - self.mean).abs() / self.std_dev)
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    let mut min = values[0];
    let mut max = values[0];
    for &v in &values[1..] {
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_all_zero() {
        let stats = WindowStats::compute(&[]);
        assert_eq!(stats, WindowStats::default());
        assert_eq!(stats.count, 0);
    }

    #[test]
    fn test_single_value() {
        let stats = WindowStats::compute(&[42.0]);
        assert_eq!(stats.mean, 42.0);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.min, 42.0);
        assert_eq!(stats.max, 42.0);
    }

    #[test]
    fn test_population_variance() {
        // 2, 4, 4, 4, 5, 5, 7, 9 has population std dev exactly 2
        let stats = WindowStats::compute(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(stats.mean, 5.0);
        assert!((stats.variance - 4.0).abs() < 1e-12);
        assert!((stats.std_dev - 2.0).abs() < 1e-12);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
    }

    #[test]
    fn test_reference_sequence() {
        let values = [100.0, 110.0, 105.0, 115.0, 120.0, 500.0, 130.0, 125.0, 118.0, 122.0];
        let stats = WindowStats::compute(&values);

        assert_eq!(stats.mean, 154.5);
        assert!((stats.variance - 13338.05).abs() < 1e-6);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 500.0);
    }

    #[test]
    fn test_identical_values_have_zero_spread() {
        for v in [0.1, 1.0 / 3.0, 1e9 + 0.7, -12.25] {
            let stats = WindowStats::compute(&[v; 37]);
            assert_eq!(stats.std_dev, 0.0, "value {v}");
            assert_eq!(stats.variance, 0.0);
            assert!(stats.z_score(v + 1.0).is_none());
        }
    }

    #[test]
    fn test_std_dev_never_nan() {
        // Large, nearly equal magnitudes push E[v²] - mean² below zero
        let values = [1e8 + 0.1, 1e8 + 0.1, 1e8 + 0.2, 1e8 + 0.1];
        let stats = WindowStats::compute(&values);
        assert!(stats.std_dev.is_finite());
        assert!(stats.std_dev >= 0.0);
    }

    #[test]
    fn test_z_score() {
        let stats = WindowStats::compute(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let z = stats.z_score(1.0).unwrap();
        assert!((z - 2.0).abs() < 1e-12);
    }
}
