//! Peripheral configuration.

use std::path::Path;
use std::{fs, io};

use tracing::{debug, warn};

use crate::att::PREPARE_BUF_MAX_SIZE;
use crate::hci::AdvParams;
use crate::le::TxPower;

/// Maximum device name length accepted by the stack.
pub const MAX_NAME_LEN: usize = 32;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Common configuration result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Peripheral configuration. Missing fields take their default values.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Config {
    /// GAP device name used in the advertising payloads.
    pub device_name: String,
    /// MTU offered during MTU exchange.
    pub local_mtu: u16,
    /// Prepared write queue capacity per connection.
    pub prepare_buf_max: usize,
    /// TX power level reported in the scan response.
    pub tx_power: TxPower,
    /// Whether to configure and start advertising again after a disconnect.
    pub readvertise_on_disconnect: bool,
    /// Advertising parameters.
    pub adv: AdvParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_name: "ESP_GATTS_DEMO".to_owned(),
            local_mtu: 500,
            prepare_buf_max: PREPARE_BUF_MAX_SIZE,
            tx_power: TxPower::default(),
            readvertise_on_disconnect: true,
            adv: AdvParams::default(),
        }
    }
}

impl Config {
    /// Parses a JSON configuration.
    pub fn from_json(s: &str) -> Result<Self> {
        let mut c: Self = serde_json::from_str(s)?;
        c.normalize();
        Ok(c)
    }

    /// Loads a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Truncates the device name to [`MAX_NAME_LEN`] bytes on a character
    /// boundary.
    fn normalize(&mut self) {
        if self.device_name.len() <= MAX_NAME_LEN {
            return;
        }
        let mut n = MAX_NAME_LEN;
        while !self.device_name.is_char_boundary(n) {
            n -= 1;
        }
        warn!("Device name truncated to {n} bytes");
        self.device_name.truncate(n);
    }
}
