//! Station shared library
//!
//! Provides basic functions shared by station services, including:
//! - logging initialization
//! - SQLite client
//! - `InfluxDB` line protocol builder

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub mod influxdb;
pub mod logging;

pub use influxdb::{FieldValue, LineProtocolBuilder};
pub use logging::{init_with_config, LogConfig};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteClient, SqlitePool};

// Re-export common dependencies
pub use anyhow;
