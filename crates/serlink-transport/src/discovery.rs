use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::link::TtyLink;

/// File name the simulator symlinks its PTY under in `$XDG_RUNTIME_DIR`.
pub const SIMULATOR_FILE: &str = "KobraACESimulator";

/// Stable by-id node for the physical controller.
pub const DEVICE_PATH: &str = "/dev/serial/by-id/usb-ANYCUBIC_ACE_0-if00";

/// Where to look for a device and how often to retry.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Simulator PTY file name under the runtime directory.
    pub simulator_file: String,
    /// Physical device node path.
    pub device_path: PathBuf,
    /// Poll interval for [`wait_open`].
    pub poll_interval: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            simulator_file: SIMULATOR_FILE.to_string(),
            device_path: PathBuf::from(DEVICE_PATH),
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl DiscoveryConfig {
    /// Resolve the simulator PTY path from the runtime directory.
    pub fn simulator_path(&self) -> Result<PathBuf> {
        let dir = std::env::var_os("XDG_RUNTIME_DIR").ok_or(TransportError::NoRuntimeDir)?;
        Ok(Path::new(&dir).join(&self.simulator_file))
    }
}

/// Open the simulator PTY if one is exported.
pub fn open_simulator(config: &DiscoveryConfig) -> Result<TtyLink> {
    let path = config.simulator_path()?;
    let link = TtyLink::open(&path)?;
    info!(?path, "connected to simulator");
    Ok(link)
}

/// Open the physical device node.
pub fn open_device(config: &DiscoveryConfig) -> Result<TtyLink> {
    let link = TtyLink::open(&config.device_path)?;
    info!(path = ?config.device_path, "connected to device");
    Ok(link)
}

/// Try the simulator first, then the physical device.
pub fn open_any(config: &DiscoveryConfig) -> Result<TtyLink> {
    match open_simulator(config) {
        Ok(link) => return Ok(link),
        Err(err) => debug!(%err, "simulator not available"),
    }
    match open_device(config) {
        Ok(link) => Ok(link),
        Err(err) => {
            debug!(%err, "device not available");
            Err(TransportError::NotAvailable {
                simulator: config
                    .simulator_path()
                    .unwrap_or_else(|_| PathBuf::from(&config.simulator_file)),
                device: config.device_path.clone(),
            })
        }
    }
}

/// Poll until a device appears. Blocks indefinitely.
pub fn wait_open(config: &DiscoveryConfig) -> Result<TtyLink> {
    loop {
        match open_any(config) {
            Ok(link) => return Ok(link),
            Err(TransportError::NotAvailable { .. }) => {
                std::thread::sleep(config.poll_interval);
            }
            Err(other) => return Err(other),
        }
    }
}
