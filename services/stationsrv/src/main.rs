//! SRAM acquisition station (`stationsrv`)
//!
//! Runs one station operation per invocation and prints the result as JSON.

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::info;

use sram_packet::DATA_SIZE;
use stationsrv::bootstrap::{self, Args, StationCommand};
use stationsrv::config::StationConfig;
use stationsrv::service::StationService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = StationConfig::load(args.config.as_deref())?;
    config.validate()?;
    bootstrap::initialize_logging(&args, &config)?;

    if args.validate {
        info!("Validation completed successfully");
        return Ok(());
    }

    let service = bootstrap::build_service(&config).await?;
    let command = args.command.unwrap_or(StationCommand::Status);
    run(&service, command).await
}

async fn run(service: &StationService, command: StationCommand) -> anyhow::Result<()> {
    service.register_ports().await?;

    match command {
        StationCommand::Status => print_json(&service.get_status()),
        StationCommand::Ports | StationCommand::RegisterPorts => {
            print_json(&service.list_ports())
        }
        StationCommand::Ping { uid } => {
            if uid.is_some() {
                service.ping(None).await?;
            }
            match service.ping(uid.as_deref()).await? {
                Some(devices) => print_json(&devices),
                None => print_json(&serde_json::json!({ "message": "no devices" })),
            }
        }
        StationCommand::Read { uid, offset, user } => {
            service.ping(None).await?;
            print_json(&service.read(&uid, offset, user.as_deref()).await?)
        }
        StationCommand::Write {
            uid,
            offset,
            data,
            user,
        } => {
            let block = parse_block(&data)?;
            service.ping(None).await?;
            print_json(&service.write(&uid, offset, block, user.as_deref()).await?)
        }
        StationCommand::WriteInverted { uid, offset, user } => {
            service.ping(None).await?;
            print_json(
                &service
                    .write_inverted(&uid, offset, user.as_deref())
                    .await?,
            )
        }
        StationCommand::Sensors { uid } => {
            service.ping(None).await?;
            print_json(&service.sensors(&uid).await?)
        }
        StationCommand::PowerOn => {
            service.power_on().await?;
            print_json(&service.list_ports())
        }
        StationCommand::PowerOff => {
            service.power_off().await?;
            print_json(&service.list_ports())
        }
    }
}

fn parse_block(hex_data: &str) -> anyhow::Result<[u8; DATA_SIZE]> {
    let bytes = hex::decode(hex_data.trim()).context("write data must be hex")?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("write data must be {DATA_SIZE} bytes, got {len}"))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
