//! Station configuration
//!
//! Loaded with figment from a TOML file and `STATION_`-prefixed environment
//! variables (nested keys separated by `__`). Every field has a default so an
//! empty or missing file yields a usable configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StationError};

pub const DEFAULT_CONFIG_PATH: &str = "config/stationsrv.toml";
/// Environment variable naming an alternative configuration file
pub const CONFIG_PATH_ENV: &str = "STATION_CONFIG";
pub const ENV_PREFIX: &str = "STATION_";

pub const DEFAULT_BAUD_RATE: u32 = 350_000;
pub const DEFAULT_USER: &str = "TIMA";

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub station: StationSection,
    pub timing: TimingConfig,
    pub power: PowerConfig,
    pub storage: StorageConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
}

/// Station identity and port discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StationSection {
    pub name: String,
    /// User tag attached to samples and metrics when the caller gives none
    pub default_user: String,
    pub default_baud_rate: u32,
    /// Per-port baud rate, keyed by device file name (e.g. `ttyUSB0`)
    pub baud_rates: HashMap<String, u32>,
    pub device_dir: PathBuf,
    /// Substring a device file name must contain to be a candidate link
    pub port_pattern: String,
    /// Regex over OS-enumerated port names, used instead of the device directory on Windows
    pub system_port_regex: String,
}

impl Default for StationSection {
    fn default() -> Self {
        Self {
            name: "sram-station".to_string(),
            default_user: DEFAULT_USER.to_string(),
            default_baud_rate: DEFAULT_BAUD_RATE,
            baud_rates: HashMap::new(),
            device_dir: PathBuf::from("/dev"),
            port_pattern: "USB".to_string(),
            system_port_regex: ".*COM.*".to_string(),
        }
    }
}

impl StationSection {
    /// Baud rate for a port path, looked up by its file name
    pub fn baud_rate_for(&self, path: &str) -> u32 {
        Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| self.baud_rates.get(name))
            .copied()
            .unwrap_or(self.default_baud_rate)
    }
}

/// Link timing, all values in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub ping_timeout_ms: u64,
    pub command_timeout_ms: u64,
    pub settle_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub frame_deadline_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            ping_timeout_ms: 200,
            command_timeout_ms: 4000,
            settle_delay_ms: 500,
            poll_interval_ms: 100,
            frame_deadline_ms: 2000,
        }
    }
}

impl TimingConfig {
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn frame_deadline(&self) -> Duration {
        Duration::from_millis(self.frame_deadline_ms)
    }
}

/// External program switching the hub ports
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    pub program: String,
    pub on_args: Vec<String>,
    pub off_args: Vec<String>,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            program: "ykushcmd".to_string(),
            on_args: vec!["-u".to_string(), "a".to_string()],
            off_args: vec!["-d".to_string(), "a".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// SQLite database file
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            path: PathBuf::from("data/samples.db"),
        }
    }
}

/// InfluxDB 1.x sink. When disabled, metrics only go to the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub url: String,
    pub database: String,
    pub timeout_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://localhost:8086".to_string(),
            database: "sram".to_string(),
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub dir: Option<PathBuf>,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            json: false,
        }
    }
}

impl StationConfig {
    /// Load configuration.
    ///
    /// File precedence: `path`, then `STATION_CONFIG`, then
    /// `config/stationsrv.toml`. A missing file leaves the defaults in place.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => path.to_path_buf(),
            None => std::env::var(CONFIG_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
        };

        Self::figment(&file).extract().map_err(StationError::from)
    }

    pub fn figment(file: &Path) -> Figment {
        Figment::from(Serialized::defaults(StationConfig::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.station.default_baud_rate == 0 {
            return Err(StationError::Config(
                "default_baud_rate must be greater than zero".to_string(),
            ));
        }
        if let Some((port, _)) = self.station.baud_rates.iter().find(|(_, rate)| **rate == 0) {
            return Err(StationError::Config(format!(
                "baud rate for {port} must be greater than zero"
            )));
        }
        if self.station.default_user.is_empty() {
            return Err(StationError::Config(
                "default_user cannot be empty".to_string(),
            ));
        }
        regex::Regex::new(&self.station.system_port_regex)
            .map_err(|e| StationError::Config(format!("Invalid system_port_regex: {e}")))?;

        if self.timing.command_timeout_ms == 0 || self.timing.frame_deadline_ms == 0 {
            return Err(StationError::Config(
                "command_timeout_ms and frame_deadline_ms must be greater than zero".to_string(),
            ));
        }
        if self.power.program.is_empty() {
            return Err(StationError::Config(
                "power program cannot be empty".to_string(),
            ));
        }
        if self.telemetry.enabled {
            if !self.telemetry.url.starts_with("http://")
                && !self.telemetry.url.starts_with("https://")
            {
                return Err(StationError::Config(format!(
                    "telemetry url must be http(s): {}",
                    self.telemetry.url
                )));
            }
            if self.telemetry.database.is_empty() {
                return Err(StationError::Config(
                    "telemetry database cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
