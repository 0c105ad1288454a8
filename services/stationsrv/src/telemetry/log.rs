//! Log-only metrics sink

use async_trait::async_trait;
use tracing::info;

use super::{Metric, MetricsSink};
use crate::error::Result;

/// Writes metrics to the service log instead of a database
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl MetricsSink for LogSink {
    async fn log(&self, metric: &Metric) -> Result<()> {
        info!(measurement = %metric.measurement, "Metric {}", metric.to_line_protocol());
        Ok(())
    }
}
