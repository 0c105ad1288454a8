//! Station service
//!
//! Method-style operations on top of [`Station`] with the caller-side rules:
//! target devices must be registered, writes must stay inside the guard bands,
//! reads are persisted and every command is logged as a metric. Writes are
//! logged once issued, whether or not a board answered.

use std::sync::Arc;

use chrono::Utc;
use sram_packet::{Presentation, DATA_SIZE};
use tracing::{info, warn};

use crate::error::{Result, StationError};
use crate::model::{Device, PortStatus, StationStatus};
use crate::station::Station;
use crate::storage::{Sample, SampleMetadata};
use crate::telemetry::Metric;

/// Blocks kept out of reach of writes at each end of the SRAM
pub const GUARD_BLOCKS: i64 = 6;

pub struct StationService {
    station: Arc<Station>,
    default_user: String,
}

impl StationService {
    pub fn new(station: Arc<Station>, default_user: impl Into<String>) -> Self {
        Self {
            station,
            default_user: default_user.into(),
        }
    }

    pub fn station(&self) -> &Arc<Station> {
        &self.station
    }

    pub fn get_status(&self) -> StationStatus {
        self.station.status()
    }

    pub fn list_devices(&self) -> Vec<Device> {
        self.station.devices().as_ref().clone()
    }

    pub fn list_ports(&self) -> Vec<PortStatus> {
        self.station.ports()
    }

    pub async fn register_ports(&self) -> Result<usize> {
        self.station.initialize().await
    }

    /// Ping all boards, or a registered one. `None` means no board answered.
    pub async fn ping(&self, uid: Option<&str>) -> Result<Option<Vec<Presentation>>> {
        if let Some(uid) = uid {
            self.registered(uid)?;
        }
        let found = self.station.ping(uid).await?;
        Ok(if found.is_empty() { None } else { Some(found) })
    }

    pub async fn read(
        &self,
        uid: &str,
        offset: u32,
        user: Option<&str>,
    ) -> Result<Option<Presentation>> {
        self.registered(uid)?;
        let Some(result) = self.station.read(uid, offset).await? else {
            return Ok(None);
        };

        let sample = Sample {
            device: result.device.clone(),
            pic: result.pic,
            address: result
                .address
                .clone()
                .unwrap_or_else(|| sram_packet::to_address(offset)),
            timestamp: Utc::now(),
            data: result.data.clone().unwrap_or_default(),
        };
        let metadata = SampleMetadata {
            user: self.user(user).to_string(),
        };
        let id = self.station.insert_sample(&sample, &metadata).await?;
        info!("Stored sample {} for {} at {}", id, sample.device, sample.address);

        self.log_command("READ", uid, offset, user).await;
        Ok(Some(result))
    }

    pub async fn write(
        &self,
        uid: &str,
        offset: u32,
        data: [u8; DATA_SIZE],
        user: Option<&str>,
    ) -> Result<Option<Presentation>> {
        let device = self.registered(uid)?;
        check_offset(&device, offset)?;

        let result = self.station.write(uid, offset, data).await?;
        self.log_command("WRITE", uid, offset, user).await;
        Ok(result)
    }

    pub async fn write_inverted(
        &self,
        uid: &str,
        offset: u32,
        user: Option<&str>,
    ) -> Result<Option<Presentation>> {
        let device = self.registered(uid)?;
        check_offset(&device, offset)?;

        let result = self.station.write_inverted(uid, offset).await?;
        self.log_command("WRITE_INV", uid, offset, user).await;
        Ok(result)
    }

    pub async fn sensors(&self, uid: &str) -> Result<Option<Presentation>> {
        self.registered(uid)?;
        let Some(result) = self.station.sensors(uid).await? else {
            return Ok(None);
        };

        let mut metric = Metric::new("sensors").tag("device", uid);
        if let Some(temperature) = result.temperature {
            metric = metric.field("temperature", temperature);
        }
        if let Some(voltage) = result.voltage {
            metric = metric.field("voltage", voltage);
        }
        self.log_metric(&metric).await;
        Ok(Some(result))
    }

    pub async fn power_on(&self) -> Result<()> {
        self.station.set_ports_power(true).await
    }

    pub async fn power_off(&self) -> Result<()> {
        self.station.set_ports_power(false).await
    }

    fn registered(&self, uid: &str) -> Result<Device> {
        self.station
            .device(uid)
            .ok_or_else(|| StationError::DeviceNotFound(uid.to_string()))
    }

    fn user<'a>(&'a self, user: Option<&'a str>) -> &'a str {
        user.unwrap_or(&self.default_user)
    }

    async fn log_command(&self, command: &str, uid: &str, offset: u32, user: Option<&str>) {
        let metric = Metric::new("commands")
            .field("command", command)
            .tag("user", self.user(user))
            .tag("device", uid)
            .tag("address", sram_packet::to_address(offset));
        self.log_metric(&metric).await;
    }

    async fn log_metric(&self, metric: &Metric) {
        if let Err(e) = self.station.log_metric(metric).await {
            warn!("Failed to log {} metric: {}", metric.measurement, e);
        }
    }
}

/// Writable offsets are `6..=max_offset - 6`
pub fn check_offset(device: &Device, offset: u32) -> Result<()> {
    let min = GUARD_BLOCKS;
    let max = device.max_offset() - GUARD_BLOCKS;
    let value = i64::from(offset);
    if value < min || value > max {
        return Err(StationError::Range { offset, min, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PowerState;

    fn device(sram_size: u32) -> Device {
        Device {
            uid: "A".to_string(),
            pic: 0,
            state: PowerState::On,
            sram_size,
        }
    }

    #[test]
    fn test_offset_bounds_for_8k() {
        let device = device(8192);
        for offset in 0..6 {
            assert!(check_offset(&device, offset).is_err());
        }
        for offset in 6..=9 {
            assert!(check_offset(&device, offset).is_ok());
        }
        for offset in 10..20 {
            assert!(matches!(
                check_offset(&device, offset),
                Err(StationError::Range { min: 6, max: 9, .. })
            ));
        }
    }

    #[test]
    fn test_tiny_sram_has_no_writable_window() {
        let device = device(512);
        assert!(check_offset(&device, 6).is_err());
        assert!(check_offset(&device, 0).is_err());
    }
}
