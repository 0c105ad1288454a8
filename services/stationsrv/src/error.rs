//! Error handling for the station service

use sram_packet::PacketError;
use thiserror::Error;

use crate::transport::TransportError;

/// Station service error type
#[derive(Error, Debug)]
pub enum StationError {
    /// Frame encoding/decoding or calibration errors
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),

    /// Link-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Memory offset outside the writable window of the device
    #[error("Offset {offset} out of range (allowed {min}..={max})")]
    Range { offset: u32, min: i64, max: i64 },

    /// Device uid not present in the registry
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// No stored sample to derive a write from
    #[error("No reference sample for {device} at {address}")]
    ReferenceNotFound { device: String, address: String },

    /// Another hardware operation holds the station
    #[error("Station busy: another operation is executing")]
    Busy,

    /// Port power switch failed
    #[error("Hardware control error: {0}")]
    HardwareControl(String),

    /// Sample persistence errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Metrics sink errors
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Hardware task failed to complete
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Result type alias for the station service
pub type Result<T> = std::result::Result<T, StationError>;

impl StationError {
    /// Whether the error is a caller mistake rather than a station fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StationError::Range { .. }
                | StationError::DeviceNotFound(_)
                | StationError::ReferenceNotFound { .. }
                | StationError::Busy
        )
    }
}

impl From<sqlx::Error> for StationError {
    fn from(err: sqlx::Error) -> Self {
        StationError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for StationError {
    fn from(err: reqwest::Error) -> Self {
        StationError::Telemetry(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StationError {
    fn from(err: tokio::task::JoinError) -> Self {
        StationError::InternalError(format!("hardware task failed: {err}"))
    }
}

impl From<figment::Error> for StationError {
    fn from(err: figment::Error) -> Self {
        StationError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_message() {
        let err = StationError::Range {
            offset: 3,
            min: 6,
            max: 9,
        };
        assert_eq!(err.to_string(), "Offset 3 out of range (allowed 6..=9)");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_packet_error_conversion() {
        let err: StationError = PacketError::Format {
            actual: 10,
            expected: 545,
        }
        .into();
        assert!(matches!(err, StationError::Packet(_)));
        assert!(!err.is_client_error());
    }
}
