//! Mock Link for Testing
//!
//! Scripted [`LinkIo`] for exercising framing, fan-out and station logic
//! without serial hardware. Clones share state, so a test keeps one handle
//! while the transport owns another.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use sram_packet::Packet;

use super::traits::{LinkIo, LinkOpener, TransportError};

/// Computes the frames a board chain sends back for a written frame
pub type Responder = Arc<dyn Fn(&Packet) -> Vec<Packet> + Send + Sync>;

#[derive(Default)]
struct MockLinkState {
    rx: VecDeque<u8>,
    sent: Vec<Vec<u8>>,
    responder: Option<Responder>,
    fail_writes: bool,
    fail_reads: bool,
    closed: bool,
}

/// Mock link
#[derive(Clone)]
pub struct MockLink {
    path: String,
    state: Arc<Mutex<MockLinkState>>,
}

impl fmt::Debug for MockLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockLink")
            .field("path", &self.path)
            .field("pending", &state.rx.len())
            .field("sent", &state.sent.len())
            .finish()
    }
}

impl MockLink {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            state: Arc::new(Mutex::new(MockLinkState::default())),
        }
    }

    /// Queue a complete frame as incoming bytes
    pub fn push_packet(&self, packet: &Packet) {
        self.push_raw(&packet.to_bytes());
    }

    /// Queue arbitrary incoming bytes
    pub fn push_raw(&self, bytes: &[u8]) {
        self.state.lock().rx.extend(bytes.iter().copied());
    }

    /// Reply to every written frame with the frames `responder` returns
    pub fn set_responder<F>(&self, responder: F)
    where
        F: Fn(&Packet) -> Vec<Packet> + Send + Sync + 'static,
    {
        self.state.lock().responder = Some(Arc::new(responder));
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    /// Remote end goes away: reads return 0 once queued bytes are consumed
    pub fn close(&self) {
        self.state.lock().closed = true;
    }

    /// Every buffer written so far
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state.lock().sent.clone()
    }

    /// Written buffers decoded as frames
    pub fn sent_packets(&self) -> Vec<Packet> {
        self.sent()
            .iter()
            .filter_map(|bytes| Packet::from_bytes(bytes).ok())
            .collect()
    }
}

#[async_trait]
impl LinkIo for MockLink {
    fn path(&self) -> &str {
        &self.path
    }

    fn bytes_available(&self) -> Result<usize, TransportError> {
        let state = self.state.lock();
        if state.fail_reads {
            return Err(TransportError::ReceiveFailed(format!(
                "{}: mock read failure",
                self.path
            )));
        }
        Ok(state.rx.len())
    }

    fn clear_input(&mut self) -> Result<(), TransportError> {
        self.state.lock().rx.clear();
        Ok(())
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let responder = {
            let mut state = self.state.lock();
            if state.fail_writes {
                return Err(TransportError::SendFailed(format!(
                    "{}: mock write failure",
                    self.path
                )));
            }
            state.sent.push(data.to_vec());
            state.responder.clone()
        };

        if let (Some(responder), Ok(request)) = (responder, Packet::from_bytes(data)) {
            let replies = responder(&request);
            debug!("Mock link {} queued {} replies", self.path, replies.len());
            let mut state = self.state.lock();
            for reply in replies {
                state.rx.extend(reply.to_bytes().iter().copied());
            }
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn read(&mut self, buffer: &mut [u8]) -> Result<usize, TransportError> {
        let (read, closed) = {
            let mut state = self.state.lock();
            let n = buffer.len().min(state.rx.len());
            for (slot, byte) in buffer.iter_mut().zip(state.rx.drain(..n)) {
                *slot = byte;
            }
            (n, state.closed)
        };

        if read == 0 && closed {
            return Ok(0);
        }
        if read == 0 {
            // A real port blocks until data arrives; so does the mock
            return std::future::pending().await;
        }
        Ok(read)
    }
}

/// Hands out [`MockLink`]s by path
#[derive(Debug, Default)]
pub struct MockOpener {
    links: Mutex<HashMap<String, MockLink>>,
    failing: Mutex<HashSet<String>>,
    opened: Mutex<Vec<(String, u32)>>,
}

impl MockOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the link served for `path`, created on first use
    pub fn link(&self, path: &str) -> MockLink {
        self.links
            .lock()
            .entry(path.to_string())
            .or_insert_with(|| MockLink::new(path))
            .clone()
    }

    /// Make opening `path` fail
    pub fn fail_open(&self, path: &str) {
        self.failing.lock().insert(path.to_string());
    }

    /// `(path, baud_rate)` of every successful open
    pub fn opened(&self) -> Vec<(String, u32)> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl LinkOpener for MockOpener {
    async fn open(&self, path: &str, baud_rate: u32) -> Result<Box<dyn LinkIo>, TransportError> {
        if self.failing.lock().contains(path) {
            return Err(TransportError::OpenFailed(format!(
                "{path}: mock open failure"
            )));
        }
        self.opened.lock().push((path.to_string(), baud_rate));
        Ok(Box::new(self.link(path)))
    }
}
