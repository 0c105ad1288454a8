//! Registry and status types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Power state of a port or device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PowerState {
    On,
    Off,
}

impl PowerState {
    pub fn from_on(on: bool) -> Self {
        if on {
            PowerState::On
        } else {
            PowerState::Off
        }
    }
}

/// Whether a hardware operation currently holds the station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StationState {
    Idle,
    Executing,
}

/// A board that answered the last ping round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub uid: String,
    pub pic: u8,
    pub state: PowerState,
    /// SRAM size in bytes
    pub sram_size: u32,
}

impl Device {
    /// Last writable block offset of this device's SRAM
    pub fn max_offset(&self) -> i64 {
        i64::from(self.sram_size) / sram_packet::DATA_SIZE as i64 - 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortStatus {
    pub port: String,
    pub state: PowerState,
}

/// Snapshot returned by the status operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationStatus {
    /// Station creation time
    pub uptime: DateTime<Utc>,
    pub ports: Vec<PortStatus>,
    pub devices: Vec<Device>,
}
