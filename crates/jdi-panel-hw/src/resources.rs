//! Acquisition of the supplies and control lines the panel needs.

use crate::error::{BoxError, ResourceError};
use crate::power::{Regulator, RegulatorBulk, SUPPLY_NAMES};
use embedded_hal::digital::OutputPin;
use tracing::{debug, error};

/// Panel enable line.
pub const GPIO_ENABLE: &str = "enable";
/// Panel reset line (asserted high).
pub const GPIO_RESET: &str = "reset";
/// DC-DC converter enable line.
pub const GPIO_DCDC_EN: &str = "dcdc-en";

/// Output level of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Low => "low",
            Level::High => "high",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Looks up board resources by name.
///
/// Handles are owned by the caller once returned and are released when
/// dropped.
pub trait ResourceProvider {
    type Regulator: Regulator;
    type Pin: OutputPin;

    /// Requests a supply by its consumer name.
    fn regulator(&mut self, supply: &'static str) -> Result<Self::Regulator, BoxError>;

    /// Requests an output line, driven to `initial` as part of acquisition.
    fn gpio(&mut self, line: &'static str, initial: Level) -> Result<Self::Pin, BoxError>;
}

/// Everything the power sequencer drives.
pub struct PanelResources<R, P> {
    pub supplies: RegulatorBulk<R>,
    pub enable: P,
    pub reset: P,
    pub dcdc_en: P,
}

impl<R: Regulator, P: OutputPin> PanelResources<R, P> {
    /// Requests the supplies and lines in order.
    ///
    /// On failure, whatever was already acquired is dropped before returning.
    pub fn acquire<Pr>(provider: &mut Pr) -> Result<Self, ResourceError>
    where
        Pr: ResourceProvider<Regulator = R, Pin = P>,
    {
        let mut supplies = Vec::with_capacity(SUPPLY_NAMES.len());
        for name in SUPPLY_NAMES {
            let supply = provider
                .regulator(name)
                .map_err(|source| failed(name, source))?;
            supplies.push((name, supply));
        }

        let enable = request_gpio(provider, GPIO_ENABLE, Level::Low)?;
        let reset = request_gpio(provider, GPIO_RESET, Level::High)?;
        let dcdc_en = request_gpio(provider, GPIO_DCDC_EN, Level::Low)?;

        debug!("panel resources acquired");
        Ok(Self {
            supplies: RegulatorBulk::new(supplies),
            enable,
            reset,
            dcdc_en,
        })
    }
}

fn request_gpio<Pr: ResourceProvider>(
    provider: &mut Pr,
    line: &'static str,
    initial: Level,
) -> Result<Pr::Pin, ResourceError> {
    provider
        .gpio(line, initial)
        .map_err(|source| failed(line, source))
}

fn failed(resource: &'static str, source: BoxError) -> ResourceError {
    let err = ResourceError { resource, source };
    error!("{}", err);
    err
}
