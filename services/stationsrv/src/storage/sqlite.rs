//! SQLite sample store

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use common::SqliteClient;
use tracing::debug;

use super::{Sample, SampleMetadata, SampleStore};
use crate::error::{Result, StationError};

/// Samples in a single `samples` table. Timestamps are stored as fixed-width
/// RFC 3339 text so they sort chronologically.
#[derive(Clone)]
pub struct SqliteSampleStore {
    client: SqliteClient,
}

impl SqliteSampleStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let client = SqliteClient::new(path)
            .await
            .map_err(|e| StationError::Storage(e.to_string()))?;
        Self::with_client(client).await
    }

    pub async fn with_client(client: SqliteClient) -> Result<Self> {
        let store = Self { client };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        debug!("Init samples table");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                device TEXT NOT NULL,
                pic INTEGER NOT NULL,
                address TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                data BLOB NOT NULL,
                user TEXT NOT NULL
            )
            "#,
        )
        .execute(self.client.pool())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_samples_reference ON samples (device, address, timestamp)",
        )
        .execute(self.client.pool())
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SampleStore for SqliteSampleStore {
    async fn insert(&self, sample: &Sample, metadata: &SampleMetadata) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO samples (device, pic, address, timestamp, data, user) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&sample.device)
        .bind(i64::from(sample.pic))
        .bind(&sample.address)
        .bind(format_timestamp(&sample.timestamp))
        .bind(&sample.data)
        .bind(&metadata.user)
        .execute(self.client.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn query_reference(&self, device: &str, address: &str) -> Result<Option<Sample>> {
        let row = sqlx::query_as::<_, (String, i64, String, String, Vec<u8>)>(
            r#"
            SELECT device, pic, address, timestamp, data FROM samples
            WHERE device = ? AND address = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(device)
        .bind(address)
        .fetch_optional(self.client.pool())
        .await?;

        row.map(|(device, pic, address, timestamp, data)| {
            let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                .map_err(|e| StationError::Storage(format!("Bad sample timestamp: {e}")))?
                .with_timezone(&Utc);
            let pic = u8::try_from(pic)
                .map_err(|_| StationError::Storage(format!("Bad sample pic: {pic}")))?;
            Ok(Sample {
                device,
                pic,
                address,
                timestamp,
                data,
            })
        })
        .transpose()
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
