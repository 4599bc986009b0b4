//! Display timing reported to the host.

use crate::error::ModeError;
use crate::{PANEL_HEIGHT, PANEL_WIDTH};
use std::collections::TryReserveError;
use std::fmt::Write as _;
use tracing::error;

/// Longest possible mode name, `65535x65535`.
const NAME_MAX_LEN: usize = 11;

/// Fixed video timing of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeDescriptor {
    /// Pixel clock in kHz.
    pub clock: u32,
    pub hdisplay: u16,
    pub hsync_start: u16,
    pub hsync_end: u16,
    pub htotal: u16,
    pub vdisplay: u16,
    pub vsync_start: u16,
    pub vsync_end: u16,
    pub vtotal: u16,
    /// Nominal refresh rate in Hz.
    pub vrefresh: u32,
    pub flags: u32,
}

/// The single mode the panel supports.
pub const DEFAULT_MODE: ModeDescriptor = ModeDescriptor {
    clock: 148876, // 148875.6
    hdisplay: PANEL_WIDTH,
    hsync_start: PANEL_WIDTH + 100,
    hsync_end: PANEL_WIDTH + 100 + 4,
    htotal: PANEL_WIDTH + 100 + 4 + 95,
    vdisplay: PANEL_HEIGHT,
    vsync_start: PANEL_HEIGHT + 10,
    vsync_end: PANEL_HEIGHT + 10 + 1,
    vtotal: PANEL_HEIGHT + 10 + 1 + 9,
    vrefresh: 30,
    flags: 0,
};

impl ModeDescriptor {
    pub fn hfront_porch(&self) -> u16 {
        self.hsync_start - self.hdisplay
    }

    pub fn hsync_width(&self) -> u16 {
        self.hsync_end - self.hsync_start
    }

    pub fn hback_porch(&self) -> u16 {
        self.htotal - self.hsync_end
    }

    pub fn vfront_porch(&self) -> u16 {
        self.vsync_start - self.vdisplay
    }

    pub fn vsync_width(&self) -> u16 {
        self.vsync_end - self.vsync_start
    }

    pub fn vback_porch(&self) -> u16 {
        self.vtotal - self.vsync_end
    }

    /// Mode name in the usual `WxH` form.
    pub fn name(&self) -> String {
        format!("{}x{}", self.hdisplay, self.vdisplay)
    }

    /// Like [`name`](Self::name), reporting allocation failure.
    pub fn try_name(&self) -> Result<String, TryReserveError> {
        let mut name = String::new();
        name.try_reserve_exact(NAME_MAX_LEN)?;
        // Fits the reservation; writing to a String cannot fail.
        let _ = write!(name, "{}x{}", self.hdisplay, self.vdisplay);
        Ok(name)
    }
}

impl std::fmt::Display for ModeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}@{}", self.hdisplay, self.vdisplay, self.vrefresh)
    }
}

/// A mode handed to the host: an owned copy plus its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMode {
    pub name: String,
    pub timing: ModeDescriptor,
}

/// Builds the host's copy of the mode list.
pub fn probe_modes(mode: &ModeDescriptor) -> Result<Vec<DisplayMode>, ModeError> {
    let mut modes = Vec::new();
    modes
        .try_reserve_exact(1)
        .map_err(|source| alloc_failed(mode, source))?;
    let name = mode.try_name().map_err(|source| alloc_failed(mode, source))?;

    modes.push(DisplayMode {
        name,
        timing: *mode,
    });
    Ok(modes)
}

fn alloc_failed(mode: &ModeDescriptor, source: TryReserveError) -> ModeError {
    let err = ModeError::Alloc {
        hdisplay: mode.hdisplay,
        vdisplay: mode.vdisplay,
        vrefresh: mode.vrefresh,
        source,
    };
    error!("{}", err);
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode() {
        assert_eq!(DEFAULT_MODE.hdisplay, 1080);
        assert_eq!(DEFAULT_MODE.vdisplay, 1920);
        assert_eq!(DEFAULT_MODE.clock, 148876);
        assert_eq!(DEFAULT_MODE.vrefresh, 30);
        assert_eq!(DEFAULT_MODE.htotal, 1279);
        assert_eq!(DEFAULT_MODE.vtotal, 1940);
    }

    #[test]
    fn test_porches() {
        assert_eq!(DEFAULT_MODE.hfront_porch(), 100);
        assert_eq!(DEFAULT_MODE.hsync_width(), 4);
        assert_eq!(DEFAULT_MODE.hback_porch(), 95);
        assert_eq!(DEFAULT_MODE.vfront_porch(), 10);
        assert_eq!(DEFAULT_MODE.vsync_width(), 1);
        assert_eq!(DEFAULT_MODE.vback_porch(), 9);
    }

    #[test]
    fn test_probe_modes() {
        let modes = probe_modes(&DEFAULT_MODE).unwrap();
        assert_eq!(modes.len(), 1);
        assert_eq!(modes[0].name, "1080x1920");
        assert_eq!(modes[0].timing, DEFAULT_MODE);
        assert_eq!(DEFAULT_MODE.to_string(), "1080x1920@30");
    }

    #[test]
    fn test_try_name() {
        assert_eq!(DEFAULT_MODE.try_name().unwrap(), DEFAULT_MODE.name());
        let widest = ModeDescriptor {
            hdisplay: u16::MAX,
            vdisplay: u16::MAX,
            ..DEFAULT_MODE
        };
        let name = widest.try_name().unwrap();
        assert_eq!(name.len(), NAME_MAX_LEN);
        assert!(name.capacity() >= NAME_MAX_LEN);
    }

    #[test]
    fn test_alloc_failure_names_the_mode() {
        let source = Vec::<u8>::new().try_reserve(usize::MAX).unwrap_err();
        let err = alloc_failed(&DEFAULT_MODE, source);
        assert!(matches!(
            err,
            ModeError::Alloc {
                hdisplay: 1080,
                vdisplay: 1920,
                vrefresh: 30,
                ..
            }
        ));
        assert!(err.to_string().starts_with("failed to add mode 1080x1920@30: "));
    }

    #[test]
    fn test_default_mode_uses_panel_geometry() {
        assert_eq!(DEFAULT_MODE.hdisplay, PANEL_WIDTH);
        assert_eq!(DEFAULT_MODE.vdisplay, PANEL_HEIGHT);
    }
}
