//! Candidate port enumeration

use std::path::PathBuf;

use regex::Regex;
use tracing::debug;

use crate::config::StationSection;
use crate::error::{Result, StationError};

/// Lists the paths discovery should try to open
pub trait PortLister: Send + Sync {
    fn list_candidate_ports(&self) -> Result<Vec<String>>;
}

/// Entries of a device directory whose name contains a pattern (Linux `/dev/*USB*`)
#[derive(Debug, Clone)]
pub struct DevDirLister {
    dir: PathBuf,
    pattern: String,
}

impl DevDirLister {
    pub fn new(dir: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            pattern: pattern.into(),
        }
    }
}

impl PortLister for DevDirLister {
    fn list_candidate_ports(&self) -> Result<Vec<String>> {
        let mut ports = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_string_lossy().contains(&self.pattern) {
                ports.push(entry.path().to_string_lossy().into_owned());
            }
        }
        ports.sort();
        debug!("{} candidate ports in {}", ports.len(), self.dir.display());
        Ok(ports)
    }
}

/// OS serial port enumeration filtered by a regex (Windows `COM` ports)
#[derive(Debug, Clone)]
pub struct SystemPortLister {
    filter: Regex,
}

impl SystemPortLister {
    pub fn new(pattern: &str) -> Result<Self> {
        let filter = Regex::new(pattern)
            .map_err(|e| StationError::Config(format!("Invalid port regex {pattern}: {e}")))?;
        Ok(Self { filter })
    }

    fn filter_names(&self, names: impl IntoIterator<Item = String>) -> Vec<String> {
        names
            .into_iter()
            .filter(|name| self.filter.is_match(name))
            .collect()
    }
}

impl PortLister for SystemPortLister {
    fn list_candidate_ports(&self) -> Result<Vec<String>> {
        let ports = tokio_serial::available_ports()
            .map_err(|e| StationError::Io(std::io::Error::other(e.to_string())))?;
        Ok(self.filter_names(ports.into_iter().map(|p| p.port_name)))
    }
}

/// The lister matching the host platform
pub fn platform_lister(config: &StationSection) -> Result<Box<dyn PortLister>> {
    if cfg!(windows) {
        Ok(Box::new(SystemPortLister::new(&config.system_port_regex)?))
    } else {
        Ok(Box::new(DevDirLister::new(
            config.device_dir.clone(),
            config.port_pattern.clone(),
        )))
    }
}

/// Fixed list of paths
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone, Default)]
pub struct StaticPortLister {
    ports: Vec<String>,
}

#[cfg(any(test, feature = "test-utils"))]
impl StaticPortLister {
    pub fn new<I, S>(ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ports: ports.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl PortLister for StaticPortLister {
    fn list_candidate_ports(&self) -> Result<Vec<String>> {
        Ok(self.ports.clone())
    }
}
