//! Driver binding: matching, probe and removal.
//!
//! Nothing registers itself; the composition root builds a
//! [`DriverRegistry`] and registers [`JDI_1080P`] with whatever probe
//! function suits its board.

use crate::dsi::{CommandTransmitter, DsiDeviceConfig, DsiHost, ModeFlags, PixelFormat};
use crate::error::{Error, Result};
use crate::panel::{JdiPanel, Panel};
use crate::power::{PowerSequencer, Regulator};
use crate::resources::{PanelResources, ResourceProvider};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use tracing::{error, info};

/// Device tree compatible string handled by this driver.
pub const COMPATIBLE: &str = "jdi,1080p";

/// Static identity of a panel driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverInfo {
    pub name: &'static str,
    pub compatible: &'static [&'static str],
}

pub const JDI_1080P: DriverInfo = DriverInfo {
    name: "panel-jdi-lt070me05000",
    compatible: &[COMPATIBLE],
};

/// Link parameters requested from the host.
pub const DSI_CONFIG: DsiDeviceConfig = DsiDeviceConfig {
    lanes: 4,
    format: PixelFormat::Rgb888,
    mode_flags: ModeFlags::VIDEO
        .union(ModeFlags::VIDEO_HSE)
        .union(ModeFlags::CLOCK_NON_CONTINUOUS),
};

/// Compatible-string lookup of registered drivers.
pub struct DriverRegistry<F> {
    entries: Vec<(DriverInfo, F)>,
}

impl<F> Default for DriverRegistry<F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<F> DriverRegistry<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a driver. Each compatible string may be claimed once.
    pub fn register(&mut self, info: DriverInfo, probe: F) -> Result<()> {
        for compatible in info.compatible {
            if self.find(compatible).is_some() {
                return Err(Error::DuplicateCompatible(compatible.to_string()));
            }
        }
        info!("registered driver {}", info.name);
        self.entries.push((info, probe));
        Ok(())
    }

    /// Finds the driver claiming `compatible`.
    pub fn find(&self, compatible: &str) -> Option<(&DriverInfo, &F)> {
        self.entries
            .iter()
            .find(|(info, _)| info.compatible.iter().any(|c| *c == compatible))
            .map(|(info, probe)| (info, probe))
    }

    /// Like [`find`](Self::find) but reports a miss as an error.
    pub fn match_compatible(&self, compatible: &str) -> Result<(&DriverInfo, &F)> {
        self.find(compatible)
            .ok_or_else(|| Error::NoDriver(compatible.to_string()))
    }

    pub fn drivers(&self) -> impl Iterator<Item = &DriverInfo> {
        self.entries.iter().map(|(info, _)| info)
    }
}

/// Acquires the panel resources and attaches to the host.
///
/// Resource failures are fatal; anything acquired before the failure is
/// released on return.
pub fn probe<Pr, H, D>(
    provider: &mut Pr,
    mut host: H,
    delay: D,
    channel: u8,
) -> Result<JdiPanel<H, Pr::Regulator, Pr::Pin, D>>
where
    Pr: ResourceProvider,
    H: DsiHost,
    D: DelayNs,
{
    let resources = PanelResources::acquire(provider)?;

    host.attach(&DSI_CONFIG).map_err(|e| {
        error!("failed to attach to DSI host: {}", e);
        Error::Attach(Box::new(e))
    })?;

    let tx = CommandTransmitter::new(host, channel, DSI_CONFIG.mode_flags);
    info!(
        "{} attached ({} lanes, {})",
        JDI_1080P.name, DSI_CONFIG.lanes, DSI_CONFIG.format
    );
    Ok(JdiPanel::new(PowerSequencer::new(resources), tx, delay))
}

/// Detaches the panel and releases its resources.
///
/// Failures are logged; removal always completes.
pub fn remove<H, R, P, D>(panel: JdiPanel<H, R, P, D>)
where
    H: DsiHost,
    R: Regulator,
    P: OutputPin,
    D: DelayNs,
{
    if let Err(e) = panel.disable() {
        error!("failed to disable panel: {}", e);
    }

    if let Err(e) = panel.with_host(|host| host.detach()) {
        error!("failed to detach from DSI host: {}", e);
    }

    drop(panel);
    info!("{} removed", JDI_1080P.name);
}

/// System shutdown hook.
pub fn shutdown<T: Panel>(panel: &T) {
    if let Err(e) = panel.disable() {
        error!("failed to disable panel: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::PanelState;
    use crate::sim::{Event, Faults, SimBoard, SimDelay, SimHost};

    #[test]
    fn test_dsi_config() {
        assert_eq!(DSI_CONFIG.lanes, 4);
        assert_eq!(DSI_CONFIG.format, PixelFormat::Rgb888);
        assert!(DSI_CONFIG.mode_flags.contains(ModeFlags::VIDEO_HSE));
        assert!(DSI_CONFIG.mode_flags.contains(ModeFlags::CLOCK_NON_CONTINUOUS));
        assert!(!DSI_CONFIG.mode_flags.contains(ModeFlags::LPM));
    }

    #[test]
    fn test_registry_matching() {
        let mut registry: DriverRegistry<fn() -> u32> = DriverRegistry::new();
        registry.register(JDI_1080P, || 7).unwrap();

        let (info, probe) = registry.match_compatible("jdi,1080p").unwrap();
        assert_eq!(info.name, "panel-jdi-lt070me05000");
        assert_eq!(probe(), 7);

        assert!(matches!(
            registry.match_compatible("sharp,ls043t1le01"),
            Err(Error::NoDriver(_))
        ));
        assert!(matches!(
            registry.register(JDI_1080P, || 8),
            Err(Error::DuplicateCompatible(_))
        ));
        assert_eq!(registry.drivers().count(), 1);
    }

    #[test]
    fn test_probe_attaches_after_resources() {
        let mut board = SimBoard::new(Faults::default());
        let trace = board.trace();
        let host = SimHost::new(trace.clone(), Faults::default());
        let panel = probe(&mut board, host, SimDelay::new(trace.clone()), 0).unwrap();
        assert_eq!(panel.state(), PanelState::Unprepared);

        let events = trace.events();
        assert_eq!(events.last(), Some(&Event::Attach(DSI_CONFIG)));
        assert_eq!(
            events.iter().filter(|e| matches!(e, Event::Acquire(_))).count(),
            5
        );
    }

    #[test]
    fn test_probe_fails_on_missing_supply() {
        let mut board = SimBoard::new(Faults {
            missing_resource: Some("iovcc".into()),
            ..Faults::default()
        });
        let trace = board.trace();
        let host = SimHost::new(trace.clone(), Faults::default());
        let err = probe(&mut board, host, SimDelay::new(trace.clone()), 0)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Resource(ref r) if r.resource == "iovcc"));
        assert!(!trace.events().iter().any(|e| matches!(e, Event::Attach(_))));
    }

    #[test]
    fn test_probe_releases_resources_when_attach_fails() {
        let mut board = SimBoard::new(Faults::default());
        let trace = board.trace();
        let host = SimHost::new(
            trace.clone(),
            Faults {
                fail_attach: true,
                ..Faults::default()
            },
        );
        assert!(probe(&mut board, host, SimDelay::new(trace.clone()), 0).is_err());
        let released = trace
            .events()
            .iter()
            .filter(|e| matches!(e, Event::Release(_)))
            .count();
        assert_eq!(released, 5);
    }

    #[test]
    fn test_remove_detaches_and_releases() {
        let mut board = SimBoard::new(Faults::default());
        let trace = board.trace();
        let host = SimHost::new(trace.clone(), Faults::default());
        let panel = probe(&mut board, host, SimDelay::new(trace.clone()), 0).unwrap();
        panel.prepare().unwrap();
        panel.enable().unwrap();
        shutdown(&panel);
        assert_eq!(panel.state(), PanelState::Prepared);

        trace.clear();
        remove(panel);
        let events = trace.events();
        assert_eq!(events[0], Event::Detach);
        assert_eq!(
            events.iter().filter(|e| matches!(e, Event::Release(_))).count(),
            5
        );
    }
}
