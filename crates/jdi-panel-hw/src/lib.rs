//! JDI 1080p Panel Hardware Library
//!
//! Power sequencing and MIPI-DSI bring-up for the JDI 1080x1920 panel
//! (LT070ME05000 family). Supplies and control lines come from a
//! [`ResourceProvider`], commands go out through a [`dsi::DsiHost`].

pub mod driver;
pub mod dsi;
pub mod error;
pub mod init_sequence;
pub mod mode;
pub mod panel;
pub mod power;
pub mod resources;
pub mod sim;

pub use driver::{
    probe, remove, shutdown, DriverInfo, DriverRegistry, COMPATIBLE, DSI_CONFIG, JDI_1080P,
};
pub use error::{Error, ModeError, PowerError, ResourceError, Result, TxError};
pub use init_sequence::INIT_SEQUENCE;
pub use mode::{DisplayMode, ModeDescriptor, DEFAULT_MODE};
pub use panel::{JdiPanel, Panel, PanelState};
pub use power::{PowerSequencer, Regulator, RegulatorBulk};
pub use resources::{Level, PanelResources, ResourceProvider};

/// Active area width in pixels.
pub const PANEL_WIDTH: u16 = 1080;
/// Active area height in pixels.
pub const PANEL_HEIGHT: u16 = 1920;
