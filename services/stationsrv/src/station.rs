//! Station orchestrator
//!
//! Builds protocol commands, runs them through the [`DeviceManager`] and keeps
//! the device registry. Every hardware operation holds a single-permit guard;
//! a second caller is rejected with [`StationError::Busy`] instead of waiting.
//! Operations run detached from the caller and cannot be cancelled once started.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sram_packet::{default_uid, to_address, Command, Packet, Presentation, DATA_SIZE};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::error::{Result, StationError};
use crate::manager::DeviceManager;
use crate::model::{Device, PortStatus, PowerState, StationState, StationStatus};
use crate::power::PowerSwitch;
use crate::storage::{Sample, SampleMetadata, SampleStore};
use crate::telemetry::{Metric, MetricsSink};

type Registry = Arc<RwLock<Arc<Vec<Device>>>>;

pub struct Station {
    manager: Arc<DeviceManager>,
    devices: Registry,
    guard: Arc<Semaphore>,
    created_at: DateTime<Utc>,
    store: Arc<dyn SampleStore>,
    metrics: Arc<dyn MetricsSink>,
    power: Arc<dyn PowerSwitch>,
}

impl Station {
    pub fn new(
        manager: DeviceManager,
        store: Arc<dyn SampleStore>,
        metrics: Arc<dyn MetricsSink>,
        power: Arc<dyn PowerSwitch>,
    ) -> Self {
        Self {
            manager: Arc::new(manager),
            devices: Arc::new(RwLock::new(Arc::new(Vec::new()))),
            guard: Arc::new(Semaphore::new(1)),
            created_at: Utc::now(),
            store,
            metrics,
            power,
        }
    }

    fn begin(&self) -> Result<OwnedSemaphorePermit> {
        self.guard.clone().try_acquire_owned().map_err(|_| {
            debug!("Rejecting request, station busy");
            StationError::Busy
        })
    }

    /// Run `task` on its own tokio task while holding the guard.
    ///
    /// The permit moves into the task, so a caller that stops waiting leaves
    /// the exchange running and the station EXECUTING until it completes.
    async fn execute<T, F>(&self, task: F) -> Result<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let permit = self.begin()?;
        tokio::spawn(async move {
            let result = task.await;
            drop(permit);
            result
        })
        .await?
    }

    pub fn state(&self) -> StationState {
        if self.guard.available_permits() == 0 {
            StationState::Executing
        } else {
            StationState::Idle
        }
    }

    /// Current device snapshot
    pub fn devices(&self) -> Arc<Vec<Device>> {
        self.devices.read().clone()
    }

    pub fn device(&self, uid: &str) -> Option<Device> {
        self.devices().iter().find(|d| d.uid == uid).cloned()
    }

    pub fn ports(&self) -> Vec<PortStatus> {
        self.manager.ports().iter().map(|p| p.status()).collect()
    }

    /// Discover links. The device registry is left untouched.
    pub async fn initialize(&self) -> Result<usize> {
        let manager = self.manager.clone();
        self.execute(async move { manager.discover().await }).await
    }

    pub fn status(&self) -> StationStatus {
        StationStatus {
            uptime: self.created_at,
            ports: self.ports(),
            devices: self.devices().as_ref().clone(),
        }
    }

    /// Ping every board, or the one matching `target`, and rebuild the registry
    /// from the replies. The first reply for each uid wins; replies that
    /// cannot be presented are dropped.
    pub async fn ping(&self, target: Option<&str>) -> Result<Vec<Presentation>> {
        let manager = self.manager.clone();
        let registry = self.devices.clone();
        let request = Packet::builder(Command::Ping)
            .uid(target.map_or_else(default_uid, str::to_string))
            .options(u32::from(target.is_some()))
            .build();

        self.execute(async move {
            *registry.write() = Arc::new(Vec::new());
            let replies = manager
                .transmit(&request, manager.timing().ping_timeout())
                .await
                .into_vec();

            let mut seen = HashSet::new();
            let mut devices = Vec::new();
            let mut found = Vec::new();
            for reply in replies {
                if !seen.insert(reply.uid().to_string()) {
                    continue;
                }
                match Presentation::from_packet(&reply) {
                    Ok(presentation) => {
                        devices.push(Device {
                            uid: reply.uid().to_string(),
                            pic: reply.pic(),
                            state: PowerState::On,
                            sram_size: reply.options(),
                        });
                        found.push(presentation);
                    }
                    Err(e) => warn!("Dropping ping reply from {}: {}", reply.uid(), e),
                }
            }

            *registry.write() = Arc::new(devices);
            info!("Ping found {} devices", found.len());
            Ok(found)
        })
        .await
    }

    /// Read one 512-byte block at `offset`
    pub async fn read(&self, uid: &str, offset: u32) -> Result<Option<Presentation>> {
        let request = Packet::builder(Command::Read)
            .uid(uid)
            .options(offset)
            .build();
        self.execute(exchange(self.manager.clone(), uid.to_string(), request))
            .await
    }

    /// Write one 512-byte block at `offset`. Offset bounds are the caller's concern.
    pub async fn write(
        &self,
        uid: &str,
        offset: u32,
        data: [u8; DATA_SIZE],
    ) -> Result<Option<Presentation>> {
        let request = write_request(uid, offset, data);
        self.execute(exchange(self.manager.clone(), uid.to_string(), request))
            .await
    }

    /// Write the bitwise inverse of the most recent stored sample at `offset`
    pub async fn write_inverted(&self, uid: &str, offset: u32) -> Result<Option<Presentation>> {
        let manager = self.manager.clone();
        let store = self.store.clone();
        let uid = uid.to_string();

        self.execute(async move {
            let address = to_address(offset);
            let reference = store
                .query_reference(&uid, &address)
                .await?
                .ok_or_else(|| StationError::ReferenceNotFound {
                    device: uid.clone(),
                    address: address.clone(),
                })?;

            let block: [u8; DATA_SIZE] =
                reference.data.as_slice().try_into().map_err(|_| {
                    StationError::Storage(format!(
                        "Reference sample at {address} has {} bytes",
                        reference.data.len()
                    ))
                })?;
            let request = write_request(&uid, offset, block.map(|b| !b));
            exchange(manager, uid, request).await
        })
        .await
    }

    /// Read the temperature and supply voltage of a board
    pub async fn sensors(&self, uid: &str) -> Result<Option<Presentation>> {
        let request = Packet::builder(Command::Sensors).uid(uid).build();
        self.execute(exchange(self.manager.clone(), uid.to_string(), request))
            .await
    }

    /// Switch hub power. Registry states change only if the switch succeeds.
    pub async fn set_ports_power(&self, on: bool) -> Result<()> {
        let manager = self.manager.clone();
        let registry = self.devices.clone();
        let power = self.power.clone();

        self.execute(async move {
            power.set_power(on).await?;

            let state = PowerState::from_on(on);
            manager.set_port_states(state);
            let mut devices = registry.write();
            let updated = devices
                .iter()
                .map(|d| Device {
                    state,
                    ..d.clone()
                })
                .collect();
            *devices = Arc::new(updated);
            Ok(())
        })
        .await
    }

    pub async fn insert_sample(&self, sample: &Sample, metadata: &SampleMetadata) -> Result<i64> {
        self.store.insert(sample, metadata).await
    }

    pub async fn log_metric(&self, metric: &Metric) -> Result<()> {
        self.metrics.log(metric).await
    }

    pub async fn query_reference(&self, device: &str, address: &str) -> Result<Option<Sample>> {
        self.store.query_reference(device, address).await
    }
}

fn write_request(uid: &str, offset: u32, data: [u8; DATA_SIZE]) -> Packet {
    Packet::builder(Command::Write)
        .uid(uid)
        .options(offset)
        .data(data)
        .build()
}

async fn exchange(
    manager: Arc<DeviceManager>,
    uid: String,
    request: Packet,
) -> Result<Option<Presentation>> {
    let replies = manager
        .transmit(&request, manager.timing().command_timeout())
        .await
        .into_vec();

    match select_reply(replies, &uid) {
        Some(reply) => Ok(Some(Presentation::from_packet(&reply)?)),
        None => {
            warn!("No reply to {} for {}", request.command(), uid);
            Ok(None)
        }
    }
}

/// The reply addressed to `uid`, else the first one
fn select_reply(mut replies: Vec<Packet>, uid: &str) -> Option<Packet> {
    match replies.iter().position(|p| p.uid() == uid) {
        Some(index) => Some(replies.swap_remove(index)),
        None if replies.is_empty() => None,
        None => Some(replies.swap_remove(0)),
    }
}
