//! Metrics sink that keeps everything it receives

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Metric, MetricsSink};
use crate::error::{Result, StationError};

#[derive(Debug, Default)]
pub struct RecordingSink {
    metrics: Mutex<Vec<Metric>>,
    fail: Mutex<bool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent metric with a telemetry error
    pub fn fail(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    pub fn metrics(&self) -> Vec<Metric> {
        self.metrics.lock().clone()
    }
}

#[async_trait]
impl MetricsSink for RecordingSink {
    async fn log(&self, metric: &Metric) -> Result<()> {
        if *self.fail.lock() {
            return Err(StationError::Telemetry("sink unavailable".to_string()));
        }
        self.metrics.lock().push(metric.clone());
        Ok(())
    }
}
