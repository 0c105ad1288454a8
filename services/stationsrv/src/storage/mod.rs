//! Sample persistence

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;

pub use memory::MemorySampleStore;
pub use sqlite::SqliteSampleStore;

/// One block read back from a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub device: String,
    pub pic: u8,
    /// Absolute memory address, `0x`-prefixed hex
    pub address: String,
    pub timestamp: DateTime<Utc>,
    pub data: Vec<u8>,
}

/// Request context stored next to a sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleMetadata {
    pub user: String,
}

#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Persist a sample, returning its id
    async fn insert(&self, sample: &Sample, metadata: &SampleMetadata) -> Result<i64>;

    /// Most recent sample for `device` at `address`
    async fn query_reference(&self, device: &str, address: &str) -> Result<Option<Sample>>;
}

/// Open the backend selected in configuration
pub async fn open_store(config: &StorageConfig) -> Result<Box<dyn SampleStore>> {
    match config.backend {
        StorageBackend::Sqlite => Ok(Box::new(SqliteSampleStore::open(&config.path).await?)),
        StorageBackend::Memory => Ok(Box::new(MemorySampleStore::new())),
    }
}
