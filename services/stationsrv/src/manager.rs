//! Device manager
//!
//! Owns the open links and fans every station command out to all of them,
//! collecting replies back in registry order.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use sram_packet::Packet;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{StationSection, TimingConfig};
use crate::error::Result;
use crate::model::{PortStatus, PowerState};
use crate::ports::PortLister;
use crate::transport::{LinkOpener, LinkTransport};

/// One discovered link
#[derive(Debug, Clone)]
pub struct Port {
    pub path: String,
    pub state: PowerState,
    pub(crate) link: Arc<Mutex<LinkTransport>>,
}

impl Port {
    pub fn status(&self) -> PortStatus {
        PortStatus {
            port: self.path.clone(),
            state: self.state,
        }
    }
}

/// Frames gathered from every link. A lone reply is kept unwrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replies {
    Single(Packet),
    Many(Vec<Packet>),
}

impl Replies {
    fn from_vec(mut packets: Vec<Packet>) -> Self {
        if packets.len() == 1 {
            if let Some(packet) = packets.pop() {
                return Replies::Single(packet);
            }
        }
        Replies::Many(packets)
    }

    pub fn into_vec(self) -> Vec<Packet> {
        match self {
            Replies::Single(packet) => vec![packet],
            Replies::Many(packets) => packets,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Replies::Single(_) => 1,
            Replies::Many(packets) => packets.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct DeviceManager {
    lister: Box<dyn PortLister>,
    opener: Arc<dyn LinkOpener>,
    station: StationSection,
    timing: TimingConfig,
    ports: RwLock<Arc<Vec<Port>>>,
}

impl DeviceManager {
    pub fn new(
        lister: Box<dyn PortLister>,
        opener: Arc<dyn LinkOpener>,
        station: StationSection,
        timing: TimingConfig,
    ) -> Self {
        Self {
            lister,
            opener,
            station,
            timing,
            ports: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Current port snapshot
    pub fn ports(&self) -> Arc<Vec<Port>> {
        self.ports.read().clone()
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Open every candidate port and replace the registry with them.
    ///
    /// Ports that fail to open are skipped. Returns the number registered.
    pub async fn discover(&self) -> Result<usize> {
        let candidates = self.lister.list_candidate_ports()?;
        debug!("Discovering links on {} candidate ports", candidates.len());

        let mut ports = Vec::with_capacity(candidates.len());
        for path in candidates {
            let baud_rate = self.station.baud_rate_for(&path);
            match self.opener.open(&path, baud_rate).await {
                Ok(io) => {
                    let link = LinkTransport::with_deadline(io, self.timing.frame_deadline());
                    ports.push(Port {
                        path,
                        state: PowerState::On,
                        link: Arc::new(Mutex::new(link)),
                    });
                }
                Err(e) => warn!("Skipping port {}: {}", path, e),
            }
        }

        let count = ports.len();
        *self.ports.write() = Arc::new(ports);
        info!("Registered {} ports", count);
        Ok(count)
    }

    /// Write `packet` to every link without waiting for replies
    pub async fn broadcast(&self, packet: &Packet) {
        let bytes = packet.to_bytes();
        for port in self.ports().iter() {
            if let Err(e) = port.link.lock().await.write(&bytes).await {
                warn!("Broadcast to {} failed: {}", port.path, e);
            }
        }
    }

    /// Drain every link with the configured settle and poll timing
    pub async fn collect(&self) -> Replies {
        self.collect_with(self.timing.settle_delay(), self.timing.poll_interval())
            .await
    }

    pub async fn collect_with(&self, settle: Duration, poll: Duration) -> Replies {
        let mut replies = Vec::new();
        for port in self.ports().iter() {
            match port.link.lock().await.read_framed(settle, poll).await {
                Ok(packets) => replies.extend(packets),
                Err(e) => warn!("Collect from {} failed: {}", port.path, e),
            }
        }
        Replies::from_vec(replies)
    }

    /// Send `packet` on each link in turn and drain its replies, waiting
    /// `timeout` before the first read on each link
    pub async fn transmit(&self, packet: &Packet, timeout: Duration) -> Replies {
        let bytes = packet.to_bytes();
        let poll = self.timing.poll_interval();
        debug!("Transmitting {} to {} links", packet, self.ports().len());

        let mut replies = Vec::new();
        for port in self.ports().iter() {
            let mut link = port.link.lock().await;
            let exchange = async {
                link.write(&bytes).await?;
                link.read_framed(timeout, poll).await
            };
            match exchange.await {
                Ok(packets) => replies.extend(packets),
                Err(e) => warn!("Transmit on {} failed: {}", port.path, e),
            }
        }
        Replies::from_vec(replies)
    }

    /// Replace the port snapshot with every port set to `state`
    pub fn set_port_states(&self, state: PowerState) {
        let mut ports = self.ports.write();
        let updated: Vec<Port> = ports
            .iter()
            .map(|port| Port {
                state,
                ..port.clone()
            })
            .collect();
        *ports = Arc::new(updated);
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::ports::StaticPortLister;
    use crate::transport::MockOpener;
    use sram_packet::Command;

    fn manager(paths: &[&str], opener: Arc<MockOpener>) -> DeviceManager {
        DeviceManager::new(
            Box::new(StaticPortLister::new(paths.iter().copied())),
            opener,
            StationSection::default(),
            TimingConfig::default(),
        )
    }

    fn ack(uid: &str) -> Packet {
        Packet::builder(Command::Ack).uid(uid).options(8192).build()
    }

    #[test]
    fn test_replies_shape() {
        assert_eq!(Replies::from_vec(vec![]), Replies::Many(vec![]));
        assert!(matches!(Replies::from_vec(vec![ack("A")]), Replies::Single(_)));
        let many = Replies::from_vec(vec![ack("A"), ack("B")]);
        assert_eq!(many.len(), 2);
        assert_eq!(many.into_vec()[1].uid(), "B");
    }

    #[tokio::test(start_paused = true)]
    async fn test_discover_uses_per_port_baud_rate() {
        let opener = Arc::new(MockOpener::new());
        let mut station = StationSection::default();
        station.baud_rates.insert("ttyUSB1".to_string(), 115_200);
        let manager = DeviceManager::new(
            Box::new(StaticPortLister::new(["/dev/ttyUSB0", "/dev/ttyUSB1"])),
            opener.clone(),
            station,
            TimingConfig::default(),
        );

        assert_eq!(manager.discover().await.unwrap(), 2);
        assert_eq!(
            opener.opened(),
            vec![
                ("/dev/ttyUSB0".to_string(), 350_000),
                ("/dev/ttyUSB1".to_string(), 115_200)
            ]
        );
        assert!(manager.ports().iter().all(|p| p.state == PowerState::On));
    }

    #[tokio::test(start_paused = true)]
    async fn test_discover_skips_ports_that_fail_to_open() {
        let opener = Arc::new(MockOpener::new());
        opener.fail_open("/dev/ttyUSB0");
        let manager = manager(&["/dev/ttyUSB0", "/dev/ttyUSB1"], opener);

        assert_eq!(manager.discover().await.unwrap(), 1);
        assert_eq!(manager.ports()[0].path, "/dev/ttyUSB1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_discover_replaces_registry() {
        let opener = Arc::new(MockOpener::new());
        let manager = manager(&["/dev/ttyUSB0"], opener);
        manager.discover().await.unwrap();
        let before = manager.ports();

        manager.discover().await.unwrap();
        assert!(!Arc::ptr_eq(&before, &manager.ports()));
        assert_eq!(manager.ports().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transmit_concatenates_in_registry_order() {
        let opener = Arc::new(MockOpener::new());
        opener
            .link("/dev/ttyUSB0")
            .set_responder(|_| vec![ack("A1"), ack("A2")]);
        opener.link("/dev/ttyUSB1").set_responder(|_| vec![ack("B1")]);
        let manager = manager(&["/dev/ttyUSB0", "/dev/ttyUSB1"], opener.clone());
        manager.discover().await.unwrap();

        let request = Packet::builder(Command::Ping).build();
        let replies = manager
            .transmit(&request, Duration::from_millis(200))
            .await
            .into_vec();

        let uids: Vec<_> = replies.iter().map(|p| p.uid()).collect();
        assert_eq!(uids, vec!["A1", "A2", "B1"]);
        assert_eq!(opener.link("/dev/ttyUSB0").sent_packets(), vec![request.clone()]);
        assert_eq!(opener.link("/dev/ttyUSB1").sent_packets(), vec![request]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transmit_single_reply_is_unwrapped() {
        let opener = Arc::new(MockOpener::new());
        opener.link("/dev/ttyUSB0").set_responder(|_| vec![ack("A")]);
        let manager = manager(&["/dev/ttyUSB0"], opener);
        manager.discover().await.unwrap();

        let replies = manager
            .transmit(&Packet::builder(Command::Ping).build(), Duration::from_millis(200))
            .await;
        assert!(matches!(replies, Replies::Single(ref p) if p.uid() == "A"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_link_does_not_drop_other_replies() {
        let opener = Arc::new(MockOpener::new());
        opener.link("/dev/ttyUSB0").fail_writes(true);
        opener.link("/dev/ttyUSB1").set_responder(|_| vec![ack("B")]);
        let manager = manager(&["/dev/ttyUSB0", "/dev/ttyUSB1"], opener);
        manager.discover().await.unwrap();

        let replies = manager
            .transmit(&Packet::builder(Command::Ping).build(), Duration::from_millis(200))
            .await
            .into_vec();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].uid(), "B");
    }

    #[tokio::test(start_paused = true)]
    async fn test_broadcast_then_collect() {
        let opener = Arc::new(MockOpener::new());
        let manager = manager(&["/dev/ttyUSB0", "/dev/ttyUSB1"], opener.clone());
        manager.discover().await.unwrap();

        let request = Packet::builder(Command::Exec).build();
        manager.broadcast(&request).await;
        assert_eq!(opener.link("/dev/ttyUSB0").sent().len(), 1);
        assert_eq!(opener.link("/dev/ttyUSB1").sent().len(), 1);

        opener.link("/dev/ttyUSB1").push_packet(&ack("late"));
        let replies = manager.collect().await.into_vec();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].uid(), "late");
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_port_states_swaps_snapshot() {
        let opener = Arc::new(MockOpener::new());
        let manager = manager(&["/dev/ttyUSB0"], opener);
        manager.discover().await.unwrap();
        let before = manager.ports();

        manager.set_port_states(PowerState::Off);
        assert_eq!(before[0].state, PowerState::On);
        assert_eq!(manager.ports()[0].state, PowerState::Off);
    }
}
