//! Caller-facing view of a reply frame

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::Result;
use crate::packet::Packet;
use crate::sensors::{to_address, SensorReadings};

/// Presentation map of a packet. Keys that do not apply to the command are
/// omitted when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    pub pic: u8,
    pub device: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sram_size: Option<u32>,
}

impl Presentation {
    /// Build the presentation of `packet`.
    ///
    /// Fails only for SENSORS replies whose calibration data is unusable.
    pub fn from_packet(packet: &Packet) -> Result<Self> {
        let mut view = Self {
            pic: packet.pic(),
            device: packet.uid().to_string(),
            data: None,
            address: None,
            checksum: None,
            temperature: None,
            voltage: None,
            sram_size: None,
        };

        match packet.command() {
            Command::Read | Command::Write => {
                view.data = Some(packet.data().to_vec());
                view.address = Some(to_address(packet.options()));
                view.checksum = Some(packet.checksum());
            }
            Command::Sensors => {
                let readings = SensorReadings::extract(packet.data())?;
                view.temperature = Some(readings.temperature()?);
                view.voltage = Some(readings.voltage()?);
            }
            Command::Ack | Command::Ping => {
                view.sram_size = Some(packet.options());
            }
            Command::Exec | Command::Err => {}
        }

        Ok(view)
    }
}

impl TryFrom<&Packet> for Presentation {
    type Error = crate::error::PacketError;

    fn try_from(packet: &Packet) -> Result<Self> {
        Presentation::from_packet(packet)
    }
}
