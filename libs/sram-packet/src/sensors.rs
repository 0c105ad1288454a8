//! Address math and on-chip sensor calibration

use serde::{Deserialize, Serialize};

use crate::error::{PacketError, Result};
use crate::packet::DATA_SIZE;

/// Base of the device SRAM in its address space
pub const SRAM_BASE_ADDRESS: u64 = 0x2000_0000;

/// Size of the sensor block at the start of a SENSORS payload
pub const SENSOR_BLOCK_SIZE: usize = 10;

/// Absolute address of a frame offset, e.g. `0x20000200` for offset 1
pub fn to_address(offset: u32) -> String {
    format!(
        "0x{:08X}",
        SRAM_BASE_ADDRESS + u64::from(offset) * DATA_SIZE as u64
    )
}

/// Raw values reported by a SENSORS reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorReadings {
    pub temp_110_cal: u16,
    pub temp_30_cal: u16,
    pub temp_raw: u16,
    pub vdd_cal: u16,
    pub vdd_raw: u16,
}

impl SensorReadings {
    /// Parse five consecutive little-endian u16 values.
    ///
    /// Callers pass the frame payload, which always holds at least
    /// [`SENSOR_BLOCK_SIZE`] bytes; shorter input is a format error.
    pub fn extract(data: &[u8]) -> Result<Self> {
        if data.len() < SENSOR_BLOCK_SIZE {
            return Err(PacketError::Format {
                actual: data.len(),
                expected: SENSOR_BLOCK_SIZE,
            });
        }

        let word = |i: usize| u16::from_le_bytes([data[2 * i], data[2 * i + 1]]);
        Ok(Self {
            temp_110_cal: word(0),
            temp_30_cal: word(1),
            temp_raw: word(2),
            vdd_cal: word(3),
            vdd_raw: word(4),
        })
    }

    pub fn temperature(&self) -> Result<f64> {
        calc_temperature(self.temp_raw, self.temp_30_cal, self.temp_110_cal)
    }

    pub fn voltage(&self) -> Result<f64> {
        calc_voltage(self.vdd_raw, self.vdd_cal)
    }
}

/// Working temperature in degrees Celsius, rounded to 5 decimals
pub fn calc_temperature(temp_raw: u16, cal_30: u16, cal_110: u16) -> Result<f64> {
    let span = f64::from(cal_110) - f64::from(cal_30);
    if span == 0.0 {
        return Err(PacketError::CalibrationData(format!(
            "temperature calibration points are equal ({cal_30})"
        )));
    }

    let slope = (110.0 - 30.0) / span;
    Ok(round5(
        slope * (f64::from(temp_raw) - f64::from(cal_30)) + 40.0,
    ))
}

/// Supply voltage in volts, rounded to 5 decimals
pub fn calc_voltage(vdd_raw: u16, vdd_cal: u16) -> Result<f64> {
    if vdd_raw == 0 {
        return Err(PacketError::CalibrationData(
            "raw supply reading is zero".to_string(),
        ));
    }

    Ok(round5(
        (3300.0 * f64::from(vdd_cal) / f64::from(vdd_raw)) * 0.001,
    ))
}

fn round5(value: f64) -> f64 {
    (value * 1e5).round() / 1e5
}
