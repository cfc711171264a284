//! In-memory sample store
//!
//! A bounded FIFO of stored samples. Nothing survives a restart.

use super::{async_trait, SampleStore, StoreResult};
use crate::models::Sample;
use std::collections::VecDeque;
use tokio::sync::RwLock;
use tracing::debug;

/// Default maximum number of samples kept by the store
pub const DEFAULT_STORE_CAPACITY: usize = 10_000;

/// Bounded in-memory store with FIFO eviction
pub struct MemoryStore {
    samples: RwLock<VecDeque<Sample>>,
    capacity: usize,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: RwLock::new(VecDeque::with_capacity(capacity.min(10_000))),
            capacity: capacity.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.samples.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.samples.read().await.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_CAPACITY)
    }
}

#[async_trait]
impl SampleStore for MemoryStore {
    async fn store(&self, sample: &Sample) -> StoreResult<()> {
        let mut samples = self.samples.write().await;

        // Evict old entries if at capacity
        while samples.len() >= self.capacity {
            samples.pop_front();
        }
        samples.push_back(*sample);

        debug!(
            timestamp = sample.timestamp,
            cpu = sample.cpu,
            rps = sample.rps,
            entries = samples.len(),
            "Stored sample"
        );
        Ok(())
    }

    async fn fetch_recent(&self, limit: usize) -> StoreResult<Vec<Sample>> {
        let samples = self.samples.read().await;
        let skip = samples.len().saturating_sub(limit);
        Ok(samples.iter().skip(skip).copied().collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: i64) -> Sample {
        Sample::new(ts, 45.5, 120.0)
    }

    #[tokio::test]
    async fn test_store_and_fetch_recent() {
        let store = MemoryStore::new(100);
        for ts in 1..=5 {
            store.store(&sample(ts)).await.unwrap();
        }

        let recent = store.fetch_recent(3).await.unwrap();
        let ts: Vec<i64> = recent.iter().map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![3, 4, 5]);

        assert_eq!(store.fetch_recent(50).await.unwrap().len(), 5);
        assert!(store.fetch_recent(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_capacity_limit() {
        let store = MemoryStore::new(5);
        for ts in 0..10 {
            store.store(&sample(ts)).await.unwrap();
        }

        assert_eq!(store.len().await, 5);
        let kept = store.fetch_recent(10).await.unwrap();
        assert_eq!(kept.first().map(|s| s.timestamp), Some(5));
        assert_eq!(kept.last().map(|s| s.timestamp), Some(9));
    }

    #[test]
    fn test_empty_store() {
        let store = MemoryStore::default();
        assert!(tokio_test::block_on(store.is_empty()));
        assert_eq!(store.capacity(), DEFAULT_STORE_CAPACITY);
        assert_eq!(store.name(), "memory");
        assert!(tokio_test::block_on(store.fetch_recent(10)).unwrap().is_empty());
    }
}
