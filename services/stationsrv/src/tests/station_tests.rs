use std::time::Duration;

use chrono::Utc;
use sram_packet::{to_address, DATA_SIZE};

use super::*;
use crate::error::StationError;
use crate::model::{PowerState, StationState};
use crate::storage::{Sample, SampleMetadata, SampleStore};

// ============================================================================
// Discovery and status
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_initialize_registers_ports_without_touching_devices() {
    let fx = Fixture::new(vec![vec![Board::new(UID_A, 0)], vec![]]);

    assert_eq!(fx.station.initialize().await.unwrap(), 2);
    let status = fx.station.status();
    assert_eq!(status.ports.len(), 2);
    assert_eq!(status.ports[0].port, "/dev/ttyUSB0");
    assert!(status.ports.iter().all(|p| p.state == PowerState::On));
    assert!(status.devices.is_empty());
    assert!(status.uptime <= Utc::now());
}

// ============================================================================
// Ping
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_ping_deduplicates_first_occurrence_wins() {
    let fx = Fixture::new(vec![
        vec![Board::new(UID_A, 0)],
        vec![Board::new(UID_A, 5), Board::new(UID_B, 1)],
    ]);
    fx.station.initialize().await.unwrap();

    let found = fx.station.ping(None).await.unwrap();

    let uids: Vec<_> = found.iter().map(|p| p.device.as_str()).collect();
    assert_eq!(uids, vec![UID_A, UID_B]);
    assert_eq!(found[0].pic, 0);
    assert_eq!(found[0].sram_size, Some(8192));

    let devices = fx.station.devices();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].uid, UID_A);
    assert_eq!(devices[0].pic, 0);
    assert_eq!(devices[0].state, PowerState::On);
    assert_eq!(devices[0].sram_size, 8192);
}

#[tokio::test(start_paused = true)]
async fn test_targeted_ping_sets_option_and_uid() {
    let fx = Fixture::new(vec![vec![Board::new(UID_A, 0), Board::new(UID_B, 1)]]);
    fx.station.initialize().await.unwrap();

    let found = fx.station.ping(Some(UID_B)).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].device, UID_B);

    let sent = fx.opener.link("/dev/ttyUSB0").sent_packets();
    assert_eq!(sent[0].options(), 1);
    assert_eq!(sent[0].uid(), UID_B);
}

#[tokio::test(start_paused = true)]
async fn test_ping_with_no_replies_clears_registry() {
    let fx = Fixture::new(vec![vec![Board::new(UID_A, 0)]]);
    fx.station.initialize().await.unwrap();
    fx.station.ping(None).await.unwrap();
    assert_eq!(fx.station.devices().len(), 1);

    fx.silence(1);
    assert!(fx.station.ping(None).await.unwrap().is_empty());
    assert!(fx.station.devices().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_ping_drops_unpresentable_reply_and_keeps_the_rest() {
    let fx = Fixture::new(vec![vec![]]);
    fx.opener.link("/dev/ttyUSB0").set_responder(|_| {
        vec![
            Packet::builder(Command::Ping).uid(UID_A).options(8192).build(),
            Packet::builder(Command::Sensors).uid(UID_B).build(),
        ]
    });
    fx.station.initialize().await.unwrap();

    let found = fx.station.ping(None).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].device, UID_A);
    let devices = fx.station.devices();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].uid, UID_A);
}

// ============================================================================
// Read / write / sensors
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_read_returns_block_with_address() {
    let fx = Fixture::new(vec![vec![Board::new(UID_A, 2)]]);
    fx.station.initialize().await.unwrap();

    let result = fx.station.read(UID_A, 7).await.unwrap().unwrap();
    assert_eq!(result.device, UID_A);
    assert_eq!(result.pic, 2);
    assert_eq!(result.address.as_deref(), Some("0x20000E00"));
    assert_eq!(result.data.unwrap(), initial_block(7).to_vec());

    let sent = fx.opener.link("/dev/ttyUSB0").sent_packets();
    assert_eq!(sent[0].pic(), 0);
    assert_eq!(sent[0].options(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_read_without_reply_is_none() {
    let fx = Fixture::new(vec![vec![Board::new(UID_A, 0)]]);
    fx.station.initialize().await.unwrap();

    assert!(fx.station.read(UID_B, 7).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_write_reaches_board() {
    let fx = Fixture::new(vec![vec![Board::new(UID_A, 0)]]);
    fx.station.initialize().await.unwrap();

    let result = fx
        .station
        .write(UID_A, 8, [0x5A; DATA_SIZE])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.address.as_deref(), Some("0x20001000"));
    assert_eq!(fx.memory.get(UID_A, 8), [0x5A; DATA_SIZE]);
}

#[tokio::test(start_paused = true)]
async fn test_write_inverted_uses_most_recent_reference() {
    let fx = Fixture::new(vec![vec![Board::new(UID_A, 0)]]);
    fx.station.initialize().await.unwrap();

    let meta = SampleMetadata {
        user: "TIMA".to_string(),
    };
    let reference = |fill: u8, age: i64| Sample {
        device: UID_A.to_string(),
        pic: 0,
        address: to_address(7),
        timestamp: Utc::now() - chrono::Duration::seconds(age),
        data: vec![fill; DATA_SIZE],
    };
    fx.store.insert(&reference(0x0F, 60), &meta).await.unwrap();
    fx.store.insert(&reference(0x33, 1), &meta).await.unwrap();

    fx.station.write_inverted(UID_A, 7).await.unwrap().unwrap();
    assert_eq!(fx.memory.get(UID_A, 7), [0xCC; DATA_SIZE]);
}

#[tokio::test(start_paused = true)]
async fn test_write_inverted_without_reference_is_not_found() {
    let fx = Fixture::new(vec![vec![Board::new(UID_A, 0)]]);
    fx.station.initialize().await.unwrap();

    let err = fx.station.write_inverted(UID_A, 7).await.unwrap_err();
    assert!(matches!(
        err,
        StationError::ReferenceNotFound { ref address, .. } if address == "0x20000E00"
    ));
    assert!(fx.opener.link("/dev/ttyUSB0").sent().is_empty());
    assert_eq!(fx.station.state(), StationState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_sensors_computes_calibrated_values() {
    let fx = Fixture::new(vec![vec![Board::new(UID_A, 0)]]);
    fx.station.initialize().await.unwrap();

    let result = fx.station.sensors(UID_A).await.unwrap().unwrap();
    assert_eq!(result.temperature, Some(80.0));
    assert_eq!(result.voltage, Some(4.125));
}

#[tokio::test(start_paused = true)]
async fn test_reply_from_other_link_survives_broken_link() {
    let fx = Fixture::new(vec![vec![], vec![Board::new(UID_A, 0)]]);
    fx.station.initialize().await.unwrap();
    fx.opener.link("/dev/ttyUSB0").fail_writes(true);

    let result = fx.station.read(UID_A, 7).await.unwrap();
    assert!(result.is_some());
}

// ============================================================================
// Exclusivity
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_concurrent_operation_is_rejected_busy() {
    let fx = Fixture::new(vec![vec![Board::new(UID_A, 0)]]);
    fx.station.initialize().await.unwrap();
    assert_eq!(fx.station.state(), StationState::Idle);

    let station = fx.station.clone();
    let running = tokio::spawn(async move { station.read(UID_A, 7).await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(fx.station.state(), StationState::Executing);
    assert!(matches!(
        fx.station.ping(None).await,
        Err(StationError::Busy)
    ));
    assert!(matches!(
        fx.station.set_ports_power(false).await,
        Err(StationError::Busy)
    ));
    assert!(fx.power.calls().is_empty());

    let result = running.await.unwrap().unwrap();
    assert!(result.is_some());
    assert_eq!(fx.station.state(), StationState::Idle);

    // Only the first read went out on the link
    assert_eq!(fx.opener.link("/dev/ttyUSB0").sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_caller_giving_up_does_not_release_station() {
    let fx = Fixture::new(vec![vec![Board::new(UID_A, 0)]]);
    fx.station.initialize().await.unwrap();

    let gave_up = tokio::time::timeout(Duration::from_secs(1), fx.station.read(UID_A, 7)).await;
    assert!(gave_up.is_err());

    // The read keeps the link until its 4 s exchange finishes
    assert_eq!(fx.station.state(), StationState::Executing);
    assert!(matches!(
        fx.station.sensors(UID_A).await,
        Err(StationError::Busy)
    ));
    assert_eq!(fx.opener.link("/dev/ttyUSB0").sent().len(), 1);

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(fx.station.state(), StationState::Idle);

    let result = fx.station.sensors(UID_A).await.unwrap().unwrap();
    assert_eq!(result.temperature, Some(80.0));
}

// ============================================================================
// Power
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_power_off_updates_ports_and_devices() {
    let fx = Fixture::new(vec![vec![Board::new(UID_A, 0)]]);
    fx.station.initialize().await.unwrap();
    fx.station.ping(None).await.unwrap();

    fx.station.set_ports_power(false).await.unwrap();

    assert_eq!(fx.power.calls(), vec![false]);
    assert!(fx.station.ports().iter().all(|p| p.state == PowerState::Off));
    assert!(fx.station.devices().iter().all(|d| d.state == PowerState::Off));
}

#[tokio::test(start_paused = true)]
async fn test_power_failure_leaves_state_unchanged() {
    let fx = Fixture::new(vec![vec![Board::new(UID_A, 0)]]);
    fx.station.initialize().await.unwrap();
    fx.station.ping(None).await.unwrap();
    fx.power.fail(true);

    let err = fx.station.set_ports_power(false).await.unwrap_err();

    assert!(matches!(err, StationError::HardwareControl(_)));
    assert!(fx.station.ports().iter().all(|p| p.state == PowerState::On));
    assert!(fx.station.devices().iter().all(|d| d.state == PowerState::On));
    assert_eq!(fx.station.state(), StationState::Idle);
}
