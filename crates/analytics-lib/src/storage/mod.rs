//! Sample persistence
//!
//! Storage is an injected capability. Ingestion never depends on it
//! succeeding: callers log and count failures and carry on.

mod memory;

pub use memory::{MemoryStore, DEFAULT_STORE_CAPACITY};

pub use async_trait::async_trait;

use crate::models::Sample;
use thiserror::Error;

/// Errors returned by a [`SampleStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Trait for sample persistence backends
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Persist a single sample
    async fn store(&self, sample: &Sample) -> StoreResult<()>;

    /// Up to `limit` most recent samples, oldest first
    async fn fetch_recent(&self, limit: usize) -> StoreResult<Vec<Sample>>;

    /// Backend name used in logs and health output
    fn name(&self) -> &str;
}
