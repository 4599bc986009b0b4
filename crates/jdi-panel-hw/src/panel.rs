//! Panel state machine.
//!
//! `prepare` powers the panel and runs the bring-up commands, `unprepare`
//! turns it back off. `enable`/`disable` only track whether the image is
//! meant to be visible; the panel has no backlight control of its own.

use crate::dsi::{CommandTransmitter, DsiHost};
use crate::error::{Result, TxError};
use crate::init_sequence::INIT_SEQUENCE;
use crate::mode::{probe_modes, DisplayMode, ModeDescriptor, DEFAULT_MODE};
use crate::power::{PowerSequencer, Regulator};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{error, info, warn};

/// Settle time after the soft reset.
const SOFT_RESET_SETTLE_MS: u32 = 10;

/// Wait after entering sleep before the supplies drop.
const SLEEP_SETTLE_MS: u32 = 100;

/// Panel lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelState {
    /// Powered off.
    #[default]
    Unprepared,
    /// Powered and initialized, image not yet shown.
    Prepared,
    /// Powered and showing an image.
    Enabled,
}

impl PanelState {
    pub fn is_prepared(&self) -> bool {
        !matches!(self, PanelState::Unprepared)
    }
}

impl std::fmt::Display for PanelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PanelState::Unprepared => write!(f, "unprepared"),
            PanelState::Prepared => write!(f, "prepared"),
            PanelState::Enabled => write!(f, "enabled"),
        }
    }
}

/// Operations a display pipeline invokes on a panel.
pub trait Panel {
    fn prepare(&self) -> Result<()>;

    fn unprepare(&self) -> Result<()>;

    /// Marks the image visible. Ignored while unprepared.
    fn enable(&self) -> Result<()>;

    fn disable(&self) -> Result<()>;

    fn get_modes(&self) -> Result<Vec<DisplayMode>>;
}

struct Inner<H, R, P, D> {
    state: PanelState,
    power: PowerSequencer<R, P>,
    tx: CommandTransmitter<H>,
    delay: D,
}

/// The JDI 1080p panel.
///
/// All operations serialize on one lock, so the panel can be shared between
/// callers that may race on prepare and unprepare.
pub struct JdiPanel<H, R, P, D> {
    inner: Mutex<Inner<H, R, P, D>>,
    mode: &'static ModeDescriptor,
}

impl<H, R, P, D> JdiPanel<H, R, P, D>
where
    H: DsiHost,
    R: Regulator,
    P: OutputPin,
    D: DelayNs,
{
    pub fn new(power: PowerSequencer<R, P>, tx: CommandTransmitter<H>, delay: D) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: PanelState::Unprepared,
                power,
                tx,
                delay,
            }),
            mode: &DEFAULT_MODE,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<H, R, P, D>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> PanelState {
        self.lock().state
    }

    /// The fixed timing this panel reports.
    pub fn mode(&self) -> &'static ModeDescriptor {
        self.mode
    }

    /// Runs `f` with exclusive access to the DSI host.
    pub fn with_host<T>(&self, f: impl FnOnce(&mut H) -> T) -> T {
        f(self.lock().tx.host_mut())
    }

    fn init(tx: &mut CommandTransmitter<H>, delay: &mut D) -> std::result::Result<(), TxError> {
        tx.set_low_power(true);

        tx.soft_reset()?;
        delay.delay_ms(SOFT_RESET_SETTLE_MS);

        tx.replay(INIT_SEQUENCE)?;
        Ok(())
    }

    fn on(tx: &mut CommandTransmitter<H>) -> std::result::Result<(), TxError> {
        tx.set_low_power(true);

        tx.set_display_on().map_err(|e| {
            error!("failed to set display on: {}", e);
            e
        })
    }

    fn off(tx: &mut CommandTransmitter<H>, delay: &mut D) {
        tx.set_low_power(false);

        if let Err(e) = tx.set_display_off() {
            error!("failed to set display off: {}", e);
        }

        if let Err(e) = tx.enter_sleep_mode() {
            error!("failed to enter sleep mode: {}", e);
        }

        delay.delay_ms(SLEEP_SETTLE_MS);
    }
}

impl<H, R, P, D> Panel for JdiPanel<H, R, P, D>
where
    H: DsiHost,
    R: Regulator,
    P: OutputPin,
    D: DelayNs,
{
    fn prepare(&self) -> Result<()> {
        let mut guard = self.lock();
        if guard.state.is_prepared() {
            return Ok(());
        }

        let Inner {
            power, tx, delay, ..
        } = &mut *guard;

        power.power_up(delay)?;

        let bring_up = Self::init(tx, delay).and_then(|()| {
            info!("panel initialized");
            Self::on(tx)
        });
        if let Err(e) = bring_up {
            error!("failed to init panel: {}", e);
            if let Err(pe) = power.power_down() {
                warn!("power down after failed init: {}", pe);
            }
            return Err(e.into());
        }

        guard.state = PanelState::Prepared;
        info!("panel prepared");
        Ok(())
    }

    fn unprepare(&self) -> Result<()> {
        let mut guard = self.lock();
        if !guard.state.is_prepared() {
            return Ok(());
        }

        let Inner {
            power, tx, delay, ..
        } = &mut *guard;

        Self::off(tx, delay);

        if let Err(e) = power.power_down() {
            error!("power down failed: {}", e);
        }

        guard.state = PanelState::Unprepared;
        info!("panel unprepared");
        Ok(())
    }

    fn enable(&self) -> Result<()> {
        let mut guard = self.lock();
        match guard.state {
            PanelState::Enabled => Ok(()),
            PanelState::Prepared => {
                guard.state = PanelState::Enabled;
                info!("panel enabled");
                Ok(())
            }
            PanelState::Unprepared => {
                warn!("enable ignored, panel not prepared");
                Ok(())
            }
        }
    }

    fn disable(&self) -> Result<()> {
        let mut guard = self.lock();
        if guard.state == PanelState::Enabled {
            guard.state = PanelState::Prepared;
            info!("panel disabled");
        }
        Ok(())
    }

    fn get_modes(&self) -> Result<Vec<DisplayMode>> {
        Ok(probe_modes(self.mode)?)
    }
}
