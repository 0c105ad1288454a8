//! Codec error types

use thiserror::Error;

/// Errors raised while decoding frames or deriving values from them
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PacketError {
    /// Blob length does not match the fixed frame size
    #[error("Packet size {actual} does not match {expected}")]
    Format { actual: usize, expected: usize },

    /// Calibration data would cause a division by zero
    #[error("Invalid calibration data: {0}")]
    CalibrationData(String),

    /// Command name not part of the protocol
    #[error("Unknown command name: {0}")]
    UnknownCommand(String),
}

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, PacketError>;
