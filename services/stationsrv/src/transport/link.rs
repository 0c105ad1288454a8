//! Framed reads over a single link

use std::time::Duration;

use sram_packet::{Packet, FRAME_SIZE};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use super::traits::{LinkIo, TransportError};

/// Default hard limit for accumulating one frame
pub const DEFAULT_FRAME_DEADLINE: Duration = Duration::from_secs(2);

/// Owns one open link and reads fixed-size frames from it
#[derive(Debug)]
pub struct LinkTransport {
    io: Box<dyn LinkIo>,
    frame_deadline: Duration,
}

impl LinkTransport {
    pub fn new(io: Box<dyn LinkIo>) -> Self {
        Self::with_deadline(io, DEFAULT_FRAME_DEADLINE)
    }

    pub fn with_deadline(io: Box<dyn LinkIo>, frame_deadline: Duration) -> Self {
        Self { io, frame_deadline }
    }

    pub fn path(&self) -> &str {
        self.io.path()
    }

    /// Clear pending input, write `bytes` and flush
    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.io.clear_input()?;
        self.io.write_all(bytes).await?;
        self.io.flush().await
    }

    /// Drain every complete frame the link delivers.
    ///
    /// Waits `settle` first, then reads one frame at a time while input is
    /// available, pausing `poll` between frames. A frame that does not
    /// complete within the frame deadline is discarded and ends the drain.
    /// A link error ends the drain too; it is returned only when no frame
    /// was read before it.
    pub async fn read_framed(
        &mut self,
        settle: Duration,
        poll: Duration,
    ) -> Result<Vec<Packet>, TransportError> {
        sleep(settle).await;

        let mut packets = Vec::new();
        while self.io.bytes_available()? > 0 {
            let frame = match timeout(self.frame_deadline, self.read_frame()).await {
                Ok(Ok(frame)) => frame,
                Ok(Err(e)) if packets.is_empty() => return Err(e),
                Ok(Err(e)) => {
                    warn!(
                        port = %self.io.path(),
                        kept = packets.len(),
                        "Link failed mid-drain: {}", e
                    );
                    break;
                }
                Err(_) => {
                    warn!(
                        port = %self.io.path(),
                        deadline = ?self.frame_deadline,
                        "Partial frame discarded"
                    );
                    break;
                }
            };

            match Packet::from_bytes(&frame) {
                Ok(packet) => {
                    debug!(port = %self.io.path(), "Received {}", packet);
                    packets.push(packet);
                }
                Err(e) => warn!(port = %self.io.path(), "Dropping undecodable frame: {}", e),
            }

            sleep(poll).await;
        }

        Ok(packets)
    }

    async fn read_frame(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut frame = vec![0u8; FRAME_SIZE];
        let mut filled = 0;
        while filled < FRAME_SIZE {
            let n = self.io.read(&mut frame[filled..]).await?;
            if n == 0 {
                return Err(TransportError::ConnectionLost(format!(
                    "{} closed after {} of {} bytes",
                    self.io.path(),
                    filled,
                    FRAME_SIZE
                )));
            }
            filled += n;
        }
        Ok(frame)
    }
}
