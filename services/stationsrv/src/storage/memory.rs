//! In-process sample store

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Sample, SampleMetadata, SampleStore};
use crate::error::Result;

#[derive(Debug, Default)]
pub struct MemorySampleStore {
    rows: RwLock<Vec<(i64, Sample, SampleMetadata)>>,
}

impl MemorySampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Every stored sample with its metadata, oldest insert first
    pub fn samples(&self) -> Vec<(Sample, SampleMetadata)> {
        self.rows
            .read()
            .iter()
            .map(|(_, sample, meta)| (sample.clone(), meta.clone()))
            .collect()
    }
}

#[async_trait]
impl SampleStore for MemorySampleStore {
    async fn insert(&self, sample: &Sample, metadata: &SampleMetadata) -> Result<i64> {
        let mut rows = self.rows.write();
        let id = rows.len() as i64 + 1;
        rows.push((id, sample.clone(), metadata.clone()));
        Ok(id)
    }

    async fn query_reference(&self, device: &str, address: &str) -> Result<Option<Sample>> {
        let rows = self.rows.read();
        Ok(rows
            .iter()
            .filter(|(_, s, _)| s.device == device && s.address == address)
            .max_by_key(|(id, s, _)| (s.timestamp, *id))
            .map(|(_, s, _)| s.clone()))
    }
}
