//! `InfluxDB` 1.x HTTP sink

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use super::{Metric, MetricsSink};
use crate::config::TelemetryConfig;
use crate::error::{Result, StationError};

#[derive(Debug, Clone)]
pub struct InfluxSink {
    client: Client,
    url: String,
    database: String,
}

impl InfluxSink {
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        debug!(
            "Creating InfluxDB sink: url={}, database={}",
            config.url, config.database
        );
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            database: config.database.clone(),
        })
    }

    /// Create the database if it does not exist yet
    pub async fn initialize(&self) -> Result<()> {
        let statement = format!("CREATE DATABASE \"{}\"", self.database);
        let response = self
            .client
            .post(format!("{}/query", self.url))
            .query(&[("q", statement.as_str())])
            .send()
            .await?;

        check_status(response, "Create database").await?;
        info!("InfluxDB database ready: {}", self.database);
        Ok(())
    }

    pub fn write_url(&self) -> String {
        format!("{}/write", self.url)
    }
}

#[async_trait]
impl MetricsSink for InfluxSink {
    async fn log(&self, metric: &Metric) -> Result<()> {
        let line = metric.to_line_protocol();
        debug!(
            "Writing to InfluxDB: database={}, data_len={}",
            self.database,
            line.len()
        );

        let response = self
            .client
            .post(self.write_url())
            .query(&[("db", self.database.as_str()), ("precision", "ns")])
            .body(line)
            .send()
            .await?;

        check_status(response, "Write").await
    }
}

async fn check_status(response: reqwest::Response, action: &str) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(StationError::Telemetry(format!(
        "{action} failed with {status}: {body}"
    )))
}
