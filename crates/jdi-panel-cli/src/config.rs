//! Board description.

use anyhow::{Context, Result};
use jdi_panel_hw::sim::Faults;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Panel device node
    #[serde(default)]
    pub device: DeviceConfig,

    /// Simulated board behaviour
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Device node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Compatible string used to pick the driver
    #[serde(default = "default_compatible")]
    pub compatible: String,

    /// DSI virtual channel (0-3)
    #[serde(default)]
    pub virtual_channel: u8,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            compatible: default_compatible(),
            virtual_channel: 0,
        }
    }
}

/// Simulation and fault injection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Block for the real settle times
    #[serde(default)]
    pub real_delays: bool,

    /// Init table index whose transfer fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_frame: Option<usize>,

    /// Supply that refuses to enable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_supply: Option<String>,

    /// Resource the board does not provide
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_resource: Option<String>,
}

impl SimulationConfig {
    /// Maps the configured faults onto the simulated board.
    ///
    /// The host sees the soft reset first, so init table index `n` is
    /// transfer `n + 1`.
    pub fn faults(&self) -> Faults {
        Faults {
            missing_resource: self.missing_resource.clone(),
            fail_supply_enable: self.fail_supply.clone(),
            fail_transfer: self.fail_frame.map(|n| n + 1),
            ..Faults::default()
        }
    }
}

fn default_compatible() -> String {
    jdi_panel_hw::COMPATIBLE.to_string()
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path.as_ref(), content).context("Failed to write configuration file")?;
        Ok(())
    }
}
