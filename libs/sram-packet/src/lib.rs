//! SRAM station packet codec
//!
//! Fixed-size binary frame exchanged with the test boards:
//! - [`Packet`] encoding/decoding with the sum-mod-`0xFFFF` checksum
//! - [`Command`] codes and names
//! - address math ([`to_address`]) and sensor calibration
//! - [`Presentation`] maps handed to callers

pub mod command;
pub mod error;
pub mod packet;
pub mod presentation;
pub mod sensors;

pub use command::{command_name, Command};
pub use error::{PacketError, Result};
pub use packet::{
    default_uid, Packet, PacketBuilder, DATA_SENTINEL, DATA_SIZE, FRAME_SIZE, UID_FIELD_SIZE,
    UID_LEN,
};
pub use presentation::Presentation;
pub use sensors::{
    calc_temperature, calc_voltage, to_address, SensorReadings, SENSOR_BLOCK_SIZE,
    SRAM_BASE_ADDRESS,
};
