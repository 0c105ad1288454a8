//! Hub port power control

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::PowerConfig;
use crate::error::{Result, StationError};

#[async_trait]
pub trait PowerSwitch: Send + Sync {
    /// Switch every hub port on or off
    async fn set_power(&self, on: bool) -> Result<()>;
}

/// Runs an external hub control program (`ykushcmd` by default)
#[derive(Debug, Clone)]
pub struct CommandPowerSwitch {
    config: PowerConfig,
}

impl CommandPowerSwitch {
    pub fn new(config: PowerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PowerSwitch for CommandPowerSwitch {
    async fn set_power(&self, on: bool) -> Result<()> {
        let args = if on {
            &self.config.on_args
        } else {
            &self.config.off_args
        };
        debug!("Running {} {:?}", self.config.program, args);

        let output = Command::new(&self.config.program)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                StationError::HardwareControl(format!("{}: {e}", self.config.program))
            })?;

        if !output.status.success() {
            return Err(StationError::HardwareControl(format!(
                "{} exited with {}: {}",
                self.config.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        info!("Ports powered {}", if on { "on" } else { "off" });
        Ok(())
    }
}

/// Power switch that records requests and can be told to fail
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct MockPowerSwitch {
    calls: parking_lot::Mutex<Vec<bool>>,
    fail: parking_lot::Mutex<bool>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockPowerSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    pub fn calls(&self) -> Vec<bool> {
        self.calls.lock().clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl PowerSwitch for MockPowerSwitch {
    async fn set_power(&self, on: bool) -> Result<()> {
        self.calls.lock().push(on);
        if *self.fail.lock() {
            return Err(StationError::HardwareControl("hub not found".to_string()));
        }
        Ok(())
    }
}
