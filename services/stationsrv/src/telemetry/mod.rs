//! Metric logging

pub mod influx;
pub mod log;

#[cfg(any(test, feature = "test-utils"))]
pub mod recording;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{FieldValue, LineProtocolBuilder};

use crate::config::TelemetryConfig;
use crate::error::Result;

pub use influx::InfluxSink;
pub use log::LogSink;

#[cfg(any(test, feature = "test-utils"))]
pub use recording::RecordingSink;

/// One measurement with typed fields and string tags
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub measurement: String,
    pub fields: BTreeMap<String, FieldValue>,
    pub tags: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl Metric {
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            fields: BTreeMap::new(),
            tags: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Render as one line of line protocol with a nanosecond timestamp
    pub fn to_line_protocol(&self) -> String {
        let mut builder = LineProtocolBuilder::new(&self.measurement);
        for (key, value) in &self.tags {
            builder = builder.tag(key, value);
        }
        for (key, value) in &self.fields {
            builder = builder.field(key, value.clone());
        }
        if let Some(nanos) = self.timestamp.timestamp_nanos_opt() {
            builder = builder.timestamp(nanos);
        }
        builder.build()
    }
}

#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn log(&self, metric: &Metric) -> Result<()>;
}

/// Open the sink selected in configuration
pub async fn open_sink(config: &TelemetryConfig) -> Result<Box<dyn MetricsSink>> {
    if config.enabled {
        let sink = InfluxSink::new(config)?;
        sink.initialize().await?;
        Ok(Box::new(sink))
    } else {
        Ok(Box::new(LogSink))
    }
}
