//! Supply and control line sequencing.
//!
//! Power-up order: supplies, 20 ms settle, `dcdc-en` high, `reset` low,
//! `enable` high, each line followed by a 10 us settle. Power-down reverses
//! the lines after dropping the supplies.

use crate::error::PowerError;
use crate::resources::{Level, PanelResources, GPIO_DCDC_EN, GPIO_ENABLE, GPIO_RESET};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, OutputPin};
use tracing::{debug, error, info, warn};

/// Supply names, in enable order.
pub const SUPPLY_NAMES: [&str; 2] = ["vddp", "iovcc"];

/// Rail settle time after the supplies come up.
const SUPPLY_SETTLE_MS: u32 = 20;

/// Settle time after each control line transition.
const LINE_SETTLE_US: u32 = 10;

/// A switchable power rail.
pub trait Regulator {
    type Error: std::error::Error + Send + Sync + 'static;

    fn enable(&mut self) -> Result<(), Self::Error>;

    fn disable(&mut self) -> Result<(), Self::Error>;
}

/// Supplies switched together as one unit.
pub struct RegulatorBulk<R> {
    supplies: Vec<(&'static str, R)>,
}

impl<R: Regulator> RegulatorBulk<R> {
    pub fn new(supplies: Vec<(&'static str, R)>) -> Self {
        Self { supplies }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.supplies.iter().map(|(name, _)| *name)
    }

    /// Enables every supply in declaration order.
    ///
    /// If one fails, the supplies already enabled are switched back off so
    /// the unit is either fully on or fully off.
    pub fn enable(&mut self) -> Result<(), PowerError> {
        for i in 0..self.supplies.len() {
            let (name, supply) = &mut self.supplies[i];
            if let Err(e) = supply.enable() {
                let failed = PowerError::RegulatorEnable {
                    supply: name.to_string(),
                    source: Box::new(e),
                };
                for (name, supply) in self.supplies[..i].iter_mut().rev() {
                    if let Err(e) = supply.disable() {
                        warn!("failed to unwind regulator {}: {}", name, e);
                    }
                }
                return Err(failed);
            }
            debug!("regulator {} on", name);
        }
        Ok(())
    }

    /// Disables every supply in reverse order, attempting all of them.
    ///
    /// Returns the first failure, if any.
    pub fn disable(&mut self) -> Result<(), PowerError> {
        let mut first = None;
        for (name, supply) in self.supplies.iter_mut().rev() {
            match supply.disable() {
                Ok(()) => debug!("regulator {} off", name),
                Err(e) => {
                    let failed = PowerError::RegulatorDisable {
                        supply: name.to_string(),
                        source: Box::new(e),
                    };
                    error!("{}", failed);
                    first.get_or_insert(failed);
                }
            }
        }
        first.map_or(Ok(()), Err)
    }
}

/// Drives the supplies and the three control lines.
pub struct PowerSequencer<R, P> {
    supplies: RegulatorBulk<R>,
    enable: P,
    reset: P,
    dcdc_en: P,
}

impl<R: Regulator, P: OutputPin> PowerSequencer<R, P> {
    pub fn new(resources: PanelResources<R, P>) -> Self {
        Self {
            supplies: resources.supplies,
            enable: resources.enable,
            reset: resources.reset,
            dcdc_en: resources.dcdc_en,
        }
    }

    /// Brings the panel rails and lines up.
    ///
    /// A supply failure returns with everything still off. A line failure
    /// powers the panel back down before returning.
    pub fn power_up<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), PowerError> {
        if let Err(e) = self.supplies.enable() {
            error!("regulator enable failed, {}", e);
            return Err(e);
        }

        delay.delay_ms(SUPPLY_SETTLE_MS);

        if let Err(e) = self.raise_lines(delay) {
            error!("{}", e);
            if let Err(pe) = self.power_down() {
                warn!("power down after failed line: {}", pe);
            }
            return Err(e);
        }

        info!("panel powered up");
        Ok(())
    }

    fn raise_lines<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), PowerError> {
        drive(&mut self.dcdc_en, GPIO_DCDC_EN, Level::High)?;
        delay.delay_us(LINE_SETTLE_US);

        drive(&mut self.reset, GPIO_RESET, Level::Low)?;
        delay.delay_us(LINE_SETTLE_US);

        drive(&mut self.enable, GPIO_ENABLE, Level::High)?;
        delay.delay_us(LINE_SETTLE_US);

        Ok(())
    }

    /// Drops the supplies and parks the control lines.
    ///
    /// Every step is attempted regardless of earlier failures; the first
    /// failure is returned after the lines are parked.
    pub fn power_down(&mut self) -> Result<(), PowerError> {
        let mut result = self.supplies.disable();

        for (pin, line, level) in [
            (&mut self.enable, GPIO_ENABLE, Level::Low),
            (&mut self.reset, GPIO_RESET, Level::High),
            (&mut self.dcdc_en, GPIO_DCDC_EN, Level::Low),
        ] {
            if let Err(e) = drive(pin, line, level) {
                error!("{}", e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }

        info!("panel powered down");
        result
    }
}

fn drive<P: OutputPin>(pin: &mut P, line: &'static str, level: Level) -> Result<(), PowerError> {
    let result = match level {
        Level::High => pin.set_high(),
        Level::Low => pin.set_low(),
    };
    result.map_err(|e| PowerError::Gpio {
        line,
        level: level.as_str(),
        kind: e.kind(),
    })?;
    debug!("gpio {} {}", line, level.as_str());
    Ok(())
}
