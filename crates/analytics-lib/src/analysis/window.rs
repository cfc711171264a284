//! Bounded sample history
//!
//! Keeps the most recent `capacity` samples in arrival order. Appending past
//! capacity evicts exactly one sample from the head.

use crate::models::Sample;
use std::collections::VecDeque;

/// Default number of samples kept in the window
pub const DEFAULT_WINDOW_CAPACITY: usize = 50;

/// FIFO-evicting window of the most recent samples
#[derive(Debug, Clone)]
pub struct MetricWindow {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl MetricWindow {
    /// Create an empty window
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be non-zero");
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append at the tail, returning the evicted head if capacity was exceeded
    pub fn append(&mut self, sample: Sample) -> Option<Sample> {
        self.samples.push_back(sample);

        let evicted = if self.samples.len() > self.capacity {
            self.samples.pop_front()
        } else {
            None
        };

        assert!(
            self.samples.len() <= self.capacity,
            "window holds {} samples, capacity {}",
            self.samples.len(),
            self.capacity
        );
        evicted
    }

    /// Independent ordered copy of the window contents
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    /// `rps` values in arrival order
    pub fn rps_values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.rps).collect()
    }

    /// Most recently appended sample
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Replace the contents with the output of a retention policy
    ///
    /// Only the newest `capacity` entries of `samples` are kept, in the order given.
    pub(crate) fn replace(&mut self, samples: Vec<Sample>) {
        let skip = samples.len().saturating_sub(self.capacity);
        self.samples.clear();
        self.samples.extend(samples.into_iter().skip(skip));
    }
}

impl Default for MetricWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}
