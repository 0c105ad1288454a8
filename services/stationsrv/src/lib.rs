//! SRAM Acquisition Station Service
//!
//! Drives a chain of SRAM test boards over one or more serial links.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │ StationService  │───►│    Station      │───►│ DeviceManager   │
//! │ (caller checks) │    │ (guard, devices)│    │ (fan-out/in)    │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//!                                 │                       │
//!                                 ▼                       ▼
//!                       ┌─────────────────┐    ┌─────────────────┐
//!                       │  SampleStore    │    │ LinkTransport   │
//!                       │  MetricsSink    │    │ (framed reads)  │
//!                       │  PowerSwitch    │    │                 │
//!                       └─────────────────┘    └─────────────────┘
//! ```
//!
//! - **`transport`**: link I/O traits, serial and mock links, framed reads
//! - **`ports`**: candidate port enumeration
//! - **`manager`**: port registry and station-wide broadcast/collect/transmit
//! - **`station`**: command building, device registry, exclusivity guard
//! - **`service`**: registered-device and offset checks, persistence, metrics
//! - **`storage`**, **`telemetry`**, **`power`**: collaborators

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod manager;
pub mod model;
pub mod ports;
pub mod power;
pub mod service;
pub mod station;
pub mod storage;
pub mod telemetry;
pub mod transport;

#[cfg(test)]
mod tests;

pub use error::{Result, StationError};
pub use model::{Device, PortStatus, PowerState, StationState, StationStatus};
pub use service::StationService;
pub use station::Station;
