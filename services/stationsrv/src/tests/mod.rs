//! Station and service tests over simulated board chains

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

mod station_tests;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use sram_packet::{Command, Packet, DATA_SIZE};

use crate::config::{StationSection, TimingConfig};
use crate::manager::DeviceManager;
use crate::ports::StaticPortLister;
use crate::power::MockPowerSwitch;
use crate::service::StationService;
use crate::station::Station;
use crate::storage::MemorySampleStore;
use crate::telemetry::RecordingSink;
use crate::transport::MockOpener;

pub(crate) const UID_A: &str = "3A0041001551353431333430";
pub(crate) const UID_B: &str = "1F0032001651353431333430";

/// Calibration block giving 80.0 °C and 4.125 V
pub(crate) const SENSOR_WORDS: [u16; 5] = [2000, 1000, 1500, 1500, 1200];

#[derive(Debug, Clone)]
pub(crate) struct Board {
    pub uid: &'static str,
    pub pic: u8,
    pub sram_size: u32,
}

impl Board {
    pub fn new(uid: &'static str, pic: u8) -> Self {
        Self {
            uid,
            pic,
            sram_size: 8192,
        }
    }
}

/// Memory of every simulated board, keyed by `(uid, offset)`
#[derive(Debug, Clone, Default)]
pub(crate) struct BoardMemory(Arc<Mutex<HashMap<(String, u32), [u8; DATA_SIZE]>>>);

impl BoardMemory {
    pub fn get(&self, uid: &str, offset: u32) -> [u8; DATA_SIZE] {
        self.0
            .lock()
            .get(&(uid.to_string(), offset))
            .copied()
            .unwrap_or_else(|| initial_block(offset))
    }

    fn set(&self, uid: &str, offset: u32, data: [u8; DATA_SIZE]) {
        self.0.lock().insert((uid.to_string(), offset), data);
    }
}

/// Power-up content of a block
pub(crate) fn initial_block(offset: u32) -> [u8; DATA_SIZE] {
    let mut data = [0u8; DATA_SIZE];
    for (i, b) in data.iter_mut().enumerate() {
        *b = (i as u32 ^ offset) as u8;
    }
    data
}

/// Replies of a board chain to one request
pub(crate) fn chain_reply(boards: &[Board], memory: &BoardMemory, request: &Packet) -> Vec<Packet> {
    let targeted = |board: &&Board| board.uid == request.uid();
    match request.command() {
        Command::Ping => boards
            .iter()
            .filter(|b| request.options() == 0 || targeted(b))
            .map(|b| {
                Packet::builder(Command::Ping)
                    .uid(b.uid)
                    .pic(b.pic)
                    .options(b.sram_size)
                    .build()
            })
            .collect(),
        Command::Read => boards
            .iter()
            .filter(targeted)
            .map(|b| {
                Packet::builder(Command::Read)
                    .uid(b.uid)
                    .pic(b.pic)
                    .options(request.options())
                    .data(memory.get(b.uid, request.options()))
                    .build()
            })
            .collect(),
        Command::Write => boards
            .iter()
            .filter(targeted)
            .map(|b| {
                memory.set(b.uid, request.options(), *request.data());
                Packet::builder(Command::Write)
                    .uid(b.uid)
                    .pic(b.pic)
                    .options(request.options())
                    .data(*request.data())
                    .build()
            })
            .collect(),
        Command::Sensors => boards
            .iter()
            .filter(targeted)
            .map(|b| {
                let mut data = [0u8; DATA_SIZE];
                for (i, word) in SENSOR_WORDS.iter().enumerate() {
                    data[2 * i..2 * i + 2].copy_from_slice(&word.to_le_bytes());
                }
                Packet::builder(Command::Sensors)
                    .uid(b.uid)
                    .pic(b.pic)
                    .data(data)
                    .build()
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) struct Fixture {
    pub opener: Arc<MockOpener>,
    pub memory: BoardMemory,
    pub store: Arc<MemorySampleStore>,
    pub metrics: Arc<RecordingSink>,
    pub power: Arc<MockPowerSwitch>,
    pub station: Arc<Station>,
    pub service: StationService,
}

impl Fixture {
    /// One link per entry of `links`, each carrying its own board chain
    pub fn new(links: Vec<Vec<Board>>) -> Self {
        let opener = Arc::new(MockOpener::new());
        let memory = BoardMemory::default();
        let paths: Vec<String> = (0..links.len()).map(|i| format!("/dev/ttyUSB{i}")).collect();

        for (path, boards) in paths.iter().zip(links) {
            let memory = memory.clone();
            opener
                .link(path)
                .set_responder(move |request| chain_reply(&boards, &memory, request));
        }

        let manager = DeviceManager::new(
            Box::new(StaticPortLister::new(paths)),
            opener.clone(),
            StationSection::default(),
            TimingConfig::default(),
        );
        let store = Arc::new(MemorySampleStore::new());
        let metrics = Arc::new(RecordingSink::new());
        let power = Arc::new(MockPowerSwitch::new());
        let station = Arc::new(Station::new(
            manager,
            store.clone(),
            metrics.clone(),
            power.clone(),
        ));
        let service = StationService::new(station.clone(), "TIMA");

        Self {
            opener,
            memory,
            store,
            metrics,
            power,
            station,
            service,
        }
    }

    /// Make every link stop answering
    pub fn silence(&self, links: usize) {
        for i in 0..links {
            self.opener
                .link(&format!("/dev/ttyUSB{i}"))
                .set_responder(|_| Vec::new());
        }
    }
}
