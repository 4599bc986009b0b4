//! Simulated board.
//!
//! Regulators, lines, delays and the DSI host all append to one shared
//! [`Trace`], so the exact order of hardware operations can be inspected.
//! [`Faults`] makes individual operations fail.

use crate::dsi::{DsiDeviceConfig, DsiHost, Packet};
use crate::error::BoxError;
use crate::power::Regulator;
use crate::resources::{Level, ResourceProvider};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Error reported by simulated hardware.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct SimError(pub String);

/// One observed hardware operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Acquire(String),
    Release(String),
    SupplyOn(String),
    SupplyOff(String),
    Line { name: &'static str, high: bool },
    Delay(Duration),
    Packet {
        data_type: u8,
        flags: u8,
        payload: Vec<u8>,
    },
    Attach(DsiDeviceConfig),
    Detach,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Acquire(name) => write!(f, "get      {}", name),
            Event::Release(name) => write!(f, "put      {}", name),
            Event::SupplyOn(name) => write!(f, "supply   {} on", name),
            Event::SupplyOff(name) => write!(f, "supply   {} off", name),
            Event::Line { name, high } => write!(f, "gpio     {} = {}", name, u8::from(*high)),
            Event::Delay(d) => write!(f, "delay    {:?}", d),
            Event::Packet {
                data_type,
                flags,
                payload,
            } => {
                write!(f, "tx       {:02x} {:02x} |", data_type, flags)?;
                for byte in payload {
                    write!(f, " {:02x}", byte)?;
                }
                Ok(())
            }
            Event::Attach(config) => write!(
                f,
                "attach   {} lanes {} flags {:#x}",
                config.lanes,
                config.format,
                config.mode_flags.bits()
            ),
            Event::Detach => write!(f, "detach"),
        }
    }
}

/// Shared, ordered event log.
#[derive(Debug, Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<Event>>>);

impl Trace {
    pub fn push(&self, event: Event) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Line transitions only, in order.
    pub fn lines(&self) -> Vec<(&'static str, bool)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Line { name, high } => Some((name, high)),
                _ => None,
            })
            .collect()
    }
}

/// Operations that should fail.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Resource name the board does not provide.
    pub missing_resource: Option<String>,
    /// Supply whose enable fails.
    pub fail_supply_enable: Option<String>,
    /// Supply whose disable fails.
    pub fail_supply_disable: Option<String>,
    /// Line whose transitions fail after acquisition.
    pub fail_line: Option<String>,
    /// 0-based transfer number the host rejects, counted over all transfers.
    pub fail_transfer: Option<usize>,
    pub fail_attach: bool,
}

/// Resource provider for the simulated board.
pub struct SimBoard {
    trace: Trace,
    faults: Faults,
}

impl SimBoard {
    pub fn new(faults: Faults) -> Self {
        Self::with_trace(Trace::default(), faults)
    }

    /// A board recording into an existing trace.
    pub fn with_trace(trace: Trace, faults: Faults) -> Self {
        Self { trace, faults }
    }

    pub fn trace(&self) -> Trace {
        self.trace.clone()
    }

    fn check_present(&self, name: &str) -> Result<(), BoxError> {
        if self.faults.missing_resource.as_deref() == Some(name) {
            return Err(Box::new(SimError(format!("{} not present on board", name))));
        }
        Ok(())
    }
}

impl ResourceProvider for SimBoard {
    type Regulator = SimRegulator;
    type Pin = SimLine;

    fn regulator(&mut self, supply: &'static str) -> Result<SimRegulator, BoxError> {
        self.check_present(supply)?;
        self.trace.push(Event::Acquire(supply.to_string()));
        Ok(SimRegulator {
            name: supply,
            trace: self.trace.clone(),
            fail_enable: self.faults.fail_supply_enable.as_deref() == Some(supply),
            fail_disable: self.faults.fail_supply_disable.as_deref() == Some(supply),
        })
    }

    fn gpio(&mut self, line: &'static str, initial: Level) -> Result<SimLine, BoxError> {
        self.check_present(line)?;
        self.trace.push(Event::Acquire(line.to_string()));
        self.trace.push(Event::Line {
            name: line,
            high: initial == Level::High,
        });
        Ok(SimLine {
            name: line,
            trace: self.trace.clone(),
            fail: self.faults.fail_line.as_deref() == Some(line),
        })
    }
}

/// A simulated supply.
pub struct SimRegulator {
    name: &'static str,
    trace: Trace,
    fail_enable: bool,
    fail_disable: bool,
}

impl Regulator for SimRegulator {
    type Error = SimError;

    fn enable(&mut self) -> Result<(), SimError> {
        if self.fail_enable {
            return Err(SimError(format!("{} refused to enable", self.name)));
        }
        self.trace.push(Event::SupplyOn(self.name.to_string()));
        Ok(())
    }

    fn disable(&mut self) -> Result<(), SimError> {
        if self.fail_disable {
            return Err(SimError(format!("{} refused to disable", self.name)));
        }
        self.trace.push(Event::SupplyOff(self.name.to_string()));
        Ok(())
    }
}

impl Drop for SimRegulator {
    fn drop(&mut self) {
        self.trace.push(Event::Release(self.name.to_string()));
    }
}

/// A simulated output line.
pub struct SimLine {
    name: &'static str,
    trace: Trace,
    fail: bool,
}

impl SimLine {
    fn drive(&mut self, high: bool) -> Result<(), ErrorKind> {
        if self.fail {
            return Err(ErrorKind::Other);
        }
        self.trace.push(Event::Line {
            name: self.name,
            high,
        });
        Ok(())
    }
}

impl ErrorType for SimLine {
    type Error = ErrorKind;
}

impl OutputPin for SimLine {
    fn set_low(&mut self) -> Result<(), ErrorKind> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), ErrorKind> {
        self.drive(true)
    }
}

impl Drop for SimLine {
    fn drop(&mut self) {
        self.trace.push(Event::Release(self.name.to_string()));
    }
}

/// Delay that records its duration and optionally sleeps.
pub struct SimDelay {
    trace: Trace,
    real_time: bool,
}

impl SimDelay {
    pub fn new(trace: Trace) -> Self {
        Self {
            trace,
            real_time: false,
        }
    }

    /// Also block the calling thread for each delay.
    pub fn real_time(mut self, enabled: bool) -> Self {
        self.real_time = enabled;
        self
    }

    fn wait(&mut self, duration: Duration) {
        self.trace.push(Event::Delay(duration));
        if self.real_time {
            std::thread::sleep(duration);
        }
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.wait(Duration::from_nanos(ns as u64));
    }

    fn delay_us(&mut self, us: u32) {
        self.wait(Duration::from_micros(us as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.wait(Duration::from_millis(ms as u64));
    }
}

/// A simulated DSI host controller.
pub struct SimHost {
    trace: Trace,
    faults: Faults,
    transfers: usize,
}

impl SimHost {
    pub fn new(trace: Trace, faults: Faults) -> Self {
        Self {
            trace,
            faults,
            transfers: 0,
        }
    }

    /// Transfers attempted so far, failed ones included.
    pub fn transfers(&self) -> usize {
        self.transfers
    }
}

impl DsiHost for SimHost {
    type Error = SimError;

    fn attach(&mut self, config: &DsiDeviceConfig) -> Result<(), SimError> {
        if self.faults.fail_attach {
            return Err(SimError("host refused attach".to_string()));
        }
        self.trace.push(Event::Attach(*config));
        Ok(())
    }

    fn detach(&mut self) -> Result<(), SimError> {
        self.trace.push(Event::Detach);
        Ok(())
    }

    fn transfer(&mut self, packet: &Packet<'_>) -> Result<(), SimError> {
        let n = self.transfers;
        self.transfers += 1;
        if self.faults.fail_transfer == Some(n) {
            return Err(SimError(format!("transfer {} not acknowledged", n)));
        }
        self.trace.push(Event::Packet {
            data_type: packet.data_type(),
            flags: packet.flags().bits(),
            payload: packet.payload().to_vec(),
        });
        Ok(())
    }
}
