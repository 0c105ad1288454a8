//! Link I/O Traits
//!
//! Byte-level primitives a link must offer so the framed-read engine can run
//! over a real serial port or a scripted mock.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Link error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Port could not be opened
    #[error("Open failed: {0}")]
    OpenFailed(String),

    /// Link closed by the other side
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Raw byte access to one open link
#[async_trait]
pub trait LinkIo: Send + fmt::Debug {
    /// Path the link was opened from
    fn path(&self) -> &str;

    /// Number of bytes waiting in the input buffer
    fn bytes_available(&self) -> Result<usize, TransportError>;

    /// Drop everything waiting in the input buffer
    fn clear_input(&mut self) -> Result<(), TransportError>;

    async fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Push buffered output to the device
    async fn flush(&mut self) -> Result<(), TransportError>;

    /// Read at least one byte. Returns 0 when the link is closed.
    async fn read(&mut self, buffer: &mut [u8]) -> Result<usize, TransportError>;
}

/// Opens links by path and baud rate
#[async_trait]
pub trait LinkOpener: Send + Sync {
    async fn open(&self, path: &str, baud_rate: u32) -> Result<Box<dyn LinkIo>, TransportError>;
}
