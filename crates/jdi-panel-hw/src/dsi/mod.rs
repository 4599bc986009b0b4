//! MIPI-DSI command channel.
//!
//! Frames are built from [`CommandFrame`] values, framed into [`Packet`]s and
//! handed to a [`DsiHost`] by the [`CommandTransmitter`].

mod protocol;
mod transmitter;

pub use protocol::{crc16, dcs, CommandFrame, FrameKind, Packet, PacketFlags, HEADER_SIZE};
pub use transmitter::CommandTransmitter;

use bitflags::bitflags;

bitflags! {
    /// Peripheral mode flags negotiated with the host at attach time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModeFlags: u32 {
        /// Video mode (as opposed to command mode) scanout.
        const VIDEO = 1 << 0;
        /// Send horizontal sync end packets.
        const VIDEO_HSE = 1 << 4;
        /// Clock lane may stop between transmissions.
        const CLOCK_NON_CONTINUOUS = 1 << 10;
        /// Transmit commands in low-power mode.
        const LPM = 1 << 11;
    }
}

/// Pixel format carried over the video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb888,
    Rgb666,
    Rgb666Packed,
    Rgb565,
}

impl PixelFormat {
    /// Bits on the wire per pixel.
    pub const fn bits_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::Rgb888 | PixelFormat::Rgb666 => 24,
            PixelFormat::Rgb666Packed => 18,
            PixelFormat::Rgb565 => 16,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelFormat::Rgb888 => write!(f, "rgb888"),
            PixelFormat::Rgb666 => write!(f, "rgb666"),
            PixelFormat::Rgb666Packed => write!(f, "rgb666-packed"),
            PixelFormat::Rgb565 => write!(f, "rgb565"),
        }
    }
}

/// Link parameters the panel requests from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DsiDeviceConfig {
    /// Number of data lanes.
    pub lanes: u8,
    pub format: PixelFormat,
    pub mode_flags: ModeFlags,
}

/// The host controller side of the command channel.
///
/// Implementations deliver fully framed packets and report failure through
/// their own error type; they never see [`CommandFrame`]s directly.
pub trait DsiHost {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Binds the peripheral to the host with the given link parameters.
    fn attach(&mut self, config: &DsiDeviceConfig) -> Result<(), Self::Error>;

    /// Releases the binding made by [`DsiHost::attach`].
    fn detach(&mut self) -> Result<(), Self::Error>;

    /// Sends one packet.
    fn transfer(&mut self, packet: &Packet<'_>) -> Result<(), Self::Error>;
}

impl<H: DsiHost + ?Sized> DsiHost for &mut H {
    type Error = H::Error;

    fn attach(&mut self, config: &DsiDeviceConfig) -> Result<(), Self::Error> {
        (**self).attach(config)
    }

    fn detach(&mut self) -> Result<(), Self::Error> {
        (**self).detach()
    }

    fn transfer(&mut self, packet: &Packet<'_>) -> Result<(), Self::Error> {
        (**self).transfer(packet)
    }
}
