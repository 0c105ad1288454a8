//! Service Bootstrap and Initialization
//!
//! Command-line arguments, logging setup and wiring of the station with the
//! collaborators selected in configuration.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use common::LogConfig;
use tracing::info;

use crate::config::StationConfig;
use crate::error::Result;
use crate::manager::DeviceManager;
use crate::ports::platform_lister;
use crate::power::CommandPowerSwitch;
use crate::service::StationService;
use crate::station::Station;
use crate::storage::open_store;
use crate::telemetry::open_sink;
use crate::transport::SerialOpener;

/// Command-line arguments for stationsrv
#[derive(Parser, Debug, Clone)]
#[command(
    name = "stationsrv",
    version = env!("CARGO_PKG_VERSION"),
    about = "SRAM acquisition station",
    long_about = None
)]
pub struct Args {
    /// Configuration file (defaults to $STATION_CONFIG or config/stationsrv.toml)
    #[arg(short = 'c', long, env = "STATION_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level, overrides the configured one (trace, debug, info, warn, error)
    #[arg(short = 'l', long)]
    pub log_level: Option<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Only validate the configuration
    #[arg(long)]
    pub validate: bool,

    #[command(subcommand)]
    pub command: Option<StationCommand>,
}

/// Station operations. Device commands ping the chain first so the target
/// is registered.
#[derive(Subcommand, Debug, Clone)]
pub enum StationCommand {
    /// Uptime, ports and devices
    Status,
    /// List registered ports
    Ports,
    /// Discover ports and list them
    RegisterPorts,
    /// Ping every board, or one by uid
    Ping {
        #[arg(long)]
        uid: Option<String>,
    },
    /// Read one block
    Read {
        uid: String,
        offset: u32,
        #[arg(long)]
        user: Option<String>,
    },
    /// Write one block given as 1024 hex digits
    Write {
        uid: String,
        offset: u32,
        data: String,
        #[arg(long)]
        user: Option<String>,
    },
    /// Write the inverse of the last stored sample
    WriteInverted {
        uid: String,
        offset: u32,
        #[arg(long)]
        user: Option<String>,
    },
    /// Read temperature and voltage
    Sensors { uid: String },
    PowerOn,
    PowerOff,
}

/// Initialize logging from configuration and command-line overrides
pub fn initialize_logging(args: &Args, config: &StationConfig) -> anyhow::Result<()> {
    let log_config = LogConfig {
        service_name: "stationsrv".to_string(),
        level: args
            .log_level
            .clone()
            .unwrap_or_else(|| config.logging.level.clone()),
        log_dir: config.logging.dir.clone(),
        enable_json: config.logging.json,
        ansi: !args.no_color,
    };
    common::init_with_config(&log_config)
}

/// Build the station and its service facade from configuration
pub async fn build_service(config: &StationConfig) -> Result<StationService> {
    let manager = DeviceManager::new(
        platform_lister(&config.station)?,
        Arc::new(SerialOpener),
        config.station.clone(),
        config.timing.clone(),
    );

    let store = open_store(&config.storage).await?;
    let metrics = open_sink(&config.telemetry).await?;
    let power = CommandPowerSwitch::new(config.power.clone());

    let station = Station::new(manager, store.into(), metrics.into(), Arc::new(power));
    info!("Station {} ready", config.station.name);

    Ok(StationService::new(
        Arc::new(station),
        config.station.default_user.clone(),
    ))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_parse_write_command() {
        let args = Args::try_parse_from([
            "stationsrv",
            "write",
            "3A0041001551353431333430",
            "7",
            "00ff",
            "--user",
            "alice",
        ])
        .unwrap();

        match args.command {
            Some(StationCommand::Write {
                uid,
                offset,
                data,
                user,
            }) => {
                assert_eq!(uid, "3A0041001551353431333430");
                assert_eq!(offset, 7);
                assert_eq!(data, "00ff");
                assert_eq!(user.as_deref(), Some("alice"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_ping_without_uid() {
        let args = Args::try_parse_from(["stationsrv", "ping"]).unwrap();
        assert!(matches!(
            args.command,
            Some(StationCommand::Ping { uid: None })
        ));
    }

    #[test]
    fn test_rejects_negative_offset() {
        assert!(Args::try_parse_from(["stationsrv", "read", "A", "-1"]).is_err());
    }
}
