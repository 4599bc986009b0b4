//! DSI command framing.
//!
//! Packet layout (6 header bytes followed by the payload):
//! - `[0]` data type (0x29 generic long write, 0x05/0x15/0x39 DCS writes;
//!   a DCS opcode followed by a zero byte is sent as 0x05)
//! - `[1]` virtual channel in bits 7..6, flags in the low bits
//! - `[2..4]` payload length, little-endian
//! - `[4..6]` CRC-16 of the payload, little-endian

use crate::error::TxError;
use bitflags::bitflags;
use std::fmt;

/// Header size preceding the payload.
pub const HEADER_SIZE: usize = 6;

/// Highest virtual channel number.
const MAX_CHANNEL: u8 = 3;

/// Data type: generic long write.
const GENERIC_LONG_WRITE: u8 = 0x29;
/// Data type: DCS short write, no parameter.
const DCS_SHORT_WRITE: u8 = 0x05;
/// Data type: DCS short write, one parameter.
const DCS_SHORT_WRITE_PARAM: u8 = 0x15;
/// Data type: DCS long write.
const DCS_LONG_WRITE: u8 = 0x39;

/// Display Command Set opcodes.
pub mod dcs {
    pub const NOP: u8 = 0x00;
    pub const SOFT_RESET: u8 = 0x01;
    pub const ENTER_SLEEP_MODE: u8 = 0x10;
    pub const EXIT_SLEEP_MODE: u8 = 0x11;
    pub const SET_DISPLAY_OFF: u8 = 0x28;
    pub const SET_DISPLAY_ON: u8 = 0x29;
    pub const SET_ADDRESS_MODE: u8 = 0x36;
}

bitflags! {
    /// Per-packet flags carried in the low bits of header byte 1.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PacketFlags: u8 {
        /// Transmit in low-power mode.
        const LOW_POWER = 0x01;
        /// Request an acknowledge from the peripheral.
        const REQUEST_ACK = 0x02;
    }
}

/// How a frame's payload is interpreted by the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Vendor register write; no implicit opcode.
    GenericWrite,
    /// The first payload byte is a DCS opcode.
    DisplayCommandSetWrite,
}

/// One command destined for the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame<'a> {
    pub kind: FrameKind,
    pub payload: &'a [u8],
}

impl<'a> CommandFrame<'a> {
    /// A generic write frame.
    pub const fn generic(payload: &'a [u8]) -> Self {
        Self {
            kind: FrameKind::GenericWrite,
            payload,
        }
    }

    /// A DCS write frame.
    pub const fn dcs(payload: &'a [u8]) -> Self {
        Self {
            kind: FrameKind::DisplayCommandSetWrite,
            payload,
        }
    }

    pub const fn len(&self) -> usize {
        self.payload.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// A framed packet ready for the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet<'a> {
    data_type: u8,
    channel: u8,
    flags: PacketFlags,
    payload: &'a [u8],
    checksum: u16,
}

impl<'a> Packet<'a> {
    /// Frames a command for the given virtual channel.
    pub fn new(channel: u8, flags: PacketFlags, frame: &CommandFrame<'a>) -> Result<Self, TxError> {
        if channel > MAX_CHANNEL {
            return Err(TxError::InvalidChannel(channel));
        }
        if frame.payload.is_empty() {
            return Err(TxError::EmptyPayload);
        }
        if frame.payload.len() > u16::MAX as usize {
            return Err(TxError::PayloadTooLong(frame.payload.len()));
        }

        let data_type = match frame.kind {
            FrameKind::GenericWrite => GENERIC_LONG_WRITE,
            // A short packet always carries two data bytes; a zero second
            // byte is padding for a command without a parameter.
            FrameKind::DisplayCommandSetWrite => match frame.payload {
                [_] | [_, 0x00] => DCS_SHORT_WRITE,
                [_, _] => DCS_SHORT_WRITE_PARAM,
                _ => DCS_LONG_WRITE,
            },
        };

        Ok(Self {
            data_type,
            channel,
            flags,
            payload: frame.payload,
            checksum: crc16(frame.payload),
        })
    }

    pub fn data_type(&self) -> u8 {
        self.data_type
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn flags(&self) -> PacketFlags {
        self.flags
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    /// Encodes the 6-byte header.
    pub fn header(&self) -> [u8; HEADER_SIZE] {
        let len = self.payload.len() as u16;
        [
            self.data_type,
            (self.channel << 6) | self.flags.bits(),
            (len & 0xFF) as u8,
            (len >> 8) as u8,
            (self.checksum & 0xFF) as u8,
            (self.checksum >> 8) as u8,
        ]
    }

    /// Encodes header and payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        bytes.extend_from_slice(&self.header());
        bytes.extend_from_slice(self.payload);
        bytes
    }
}

impl fmt::Display for Packet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.to_bytes().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// DSI payload checksum: CRC-16, polynomial x^16 + x^12 + x^5 + 1,
/// LSB first, seeded with 0xFFFF.
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(0xFFFF, |mut crc, &byte| {
        crc ^= byte as u16;
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0x8408
            } else {
                crc >> 1
            };
        }
        crc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16() {
        assert_eq!(crc16(b"123456789"), 0x6F91);
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn test_generic_write_is_always_long() {
        let frame = CommandFrame::generic(&[0xb0, 0x04]);
        let packet = Packet::new(0, PacketFlags::LOW_POWER, &frame).unwrap();
        assert_eq!(packet.data_type(), 0x29);

        let bytes = packet.to_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE + 2);
        assert_eq!(bytes[0], 0x29);
        assert_eq!(bytes[1], 0x01);
        assert_eq!(bytes[2], 0x02);
        assert_eq!(bytes[3], 0x00);
        assert_eq!(&bytes[6..], &[0xb0, 0x04]);
    }

    #[test]
    fn test_dcs_data_types() {
        let short = Packet::new(0, PacketFlags::empty(), &CommandFrame::dcs(&[dcs::SET_DISPLAY_ON]))
            .unwrap();
        assert_eq!(short.data_type(), 0x05);

        let param = Packet::new(0, PacketFlags::empty(), &CommandFrame::dcs(&[0x36, 0xc0])).unwrap();
        assert_eq!(param.data_type(), 0x15);

        let padded =
            Packet::new(0, PacketFlags::empty(), &CommandFrame::dcs(&[dcs::EXIT_SLEEP_MODE, 0x00]))
                .unwrap();
        assert_eq!(padded.data_type(), 0x05);
        assert_eq!(padded.payload(), &[0x11, 0x00]);

        let long = Packet::new(0, PacketFlags::empty(), &CommandFrame::dcs(&[0x2a, 0, 0, 4, 0x37]))
            .unwrap();
        assert_eq!(long.data_type(), 0x39);
    }

    #[test]
    fn test_header_fields() {
        let payload = [0u8; 300];
        let frame = CommandFrame::generic(&payload);
        let packet = Packet::new(2, PacketFlags::LOW_POWER | PacketFlags::REQUEST_ACK, &frame)
            .unwrap();
        let header = packet.header();
        assert_eq!(header[1], 0x83);
        assert_eq!(header[2], 0x2c);
        assert_eq!(header[3], 0x01);
        let crc = crc16(&payload);
        assert_eq!(header[4], (crc & 0xFF) as u8);
        assert_eq!(header[5], (crc >> 8) as u8);
    }

    #[test]
    fn test_invalid_frames() {
        let frame = CommandFrame::dcs(&[0x29]);
        assert!(matches!(
            Packet::new(4, PacketFlags::empty(), &frame),
            Err(TxError::InvalidChannel(4))
        ));
        assert!(matches!(
            Packet::new(0, PacketFlags::empty(), &CommandFrame::generic(&[])),
            Err(TxError::EmptyPayload)
        ));
    }

    #[test]
    fn test_display_hex() {
        let packet = Packet::new(0, PacketFlags::empty(), &CommandFrame::dcs(&[0x28])).unwrap();
        let text = packet.to_string();
        assert!(text.starts_with("05 00 01 00 "));
        assert!(text.ends_with(" 28"));
    }
}
