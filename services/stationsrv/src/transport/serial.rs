//! Serial Link Implementation
//!
//! tokio-serial backed [`LinkIo`]. Ports are opened 8N1 without flow control.

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, error, info};

use super::traits::{LinkIo, LinkOpener, TransportError};

/// One open serial port
#[derive(Debug)]
pub struct SerialLink {
    path: String,
    baud_rate: u32,
    port: SerialStream,
}

impl SerialLink {
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, TransportError> {
        if path.is_empty() {
            return Err(TransportError::ConfigError(
                "Port path cannot be empty".to_string(),
            ));
        }
        if baud_rate == 0 {
            return Err(TransportError::ConfigError(
                "Baud rate must be greater than zero".to_string(),
            ));
        }

        debug!("Opening serial port: {} @ {}", path, baud_rate);

        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async();

        match port {
            Ok(mut port) => {
                #[cfg(unix)]
                port.set_exclusive(false).map_err(|e| {
                    TransportError::IoError(format!("Failed to set exclusive mode: {e}"))
                })?;

                info!("Opened serial port: {} @ {}", path, baud_rate);
                Ok(Self {
                    path: path.to_string(),
                    baud_rate,
                    port,
                })
            }
            Err(e) => {
                let error_msg = format!("Failed to open serial port {path}: {e}");
                error!("{error_msg}");
                Err(TransportError::OpenFailed(error_msg))
            }
        }
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

#[async_trait]
impl LinkIo for SerialLink {
    fn path(&self) -> &str {
        &self.path
    }

    fn bytes_available(&self) -> Result<usize, TransportError> {
        self.port
            .bytes_to_read()
            .map(|n| n as usize)
            .map_err(|e| TransportError::ReceiveFailed(format!("{}: {e}", self.path)))
    }

    fn clear_input(&mut self) -> Result<(), TransportError> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|e| TransportError::IoError(format!("{}: {e}", self.path)))
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.port
            .write_all(data)
            .await
            .map_err(|e| TransportError::SendFailed(format!("{}: {e}", self.path)))?;
        debug!(length = data.len(), direction = "send", port = %self.path, "[Serial Link] Raw frame");
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        self.port
            .flush()
            .await
            .map_err(|e| TransportError::SendFailed(format!("{}: {e}", self.path)))
    }

    async fn read(&mut self, buffer: &mut [u8]) -> Result<usize, TransportError> {
        self.port
            .read(buffer)
            .await
            .map_err(|e| TransportError::ReceiveFailed(format!("{}: {e}", self.path)))
    }
}

/// Opens [`SerialLink`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialOpener;

#[async_trait]
impl LinkOpener for SerialOpener {
    async fn open(&self, path: &str, baud_rate: u32) -> Result<Box<dyn LinkIo>, TransportError> {
        Ok(Box::new(SerialLink::open(path, baud_rate)?))
    }
}
