//! Vendor bring-up command table.
//!
//! Replayed verbatim after the soft reset settle. The table programs the
//! timing controller, the source/gate voltages, the three gamma curves and
//! the scan direction. Order matters and both `0xd5` writes are sent.

use crate::dsi::{dcs, CommandFrame};

/// Manufacturer command access protect register.
const MCAP: u8 = 0xb0;

/// Power-up command table, in transmission order.
pub const INIT_SEQUENCE: &[CommandFrame<'static>] = &[
    // Manufacturer command access
    CommandFrame::generic(&[MCAP, 0x04]),
    CommandFrame::dcs(&[dcs::NOP, 0x00]),
    CommandFrame::dcs(&[dcs::NOP, 0x00]),
    // Interface setting
    CommandFrame::generic(&[0xb3, 0x14, 0x00, 0x00, 0x00, 0x00, 0x00]),
    // DSI control
    CommandFrame::generic(&[0xb6, 0x3a, 0xd3]),
    // Display setting 1
    CommandFrame::generic(&[
        0xc1, //
        0x84, 0x60, 0x50, 0x00, 0x00, 0x00, //
        0x00, 0x00, 0x00, 0x0c, 0x01, 0x58, //
        0x73, 0xae, 0x31, 0x20, 0x06, 0x00, //
        0x00, 0x00, 0x00, 0x00, 0x00, 0x10, //
        0x10, 0x10, 0x10, 0x00, 0x00, 0x00, //
        0x22, 0x02, 0x02, 0x00,
    ]),
    // Display setting 2
    CommandFrame::generic(&[
        0xc2, //
        0x30, 0xf7, 0x80, 0x0a, 0x08, 0x00, //
        0x00,
    ]),
    // Source timing
    CommandFrame::generic(&[
        0xc4, //
        0x70, 0x00, 0x00, 0x00, 0x00, 0x04, //
        0x00, 0x00, 0x00, 0x11, 0x06, 0x00, //
        0x00, 0x00, 0x00, 0x00, 0x04, 0x00, //
        0x00, 0x00, 0x11, 0x06,
    ]),
    // LTPS timing
    CommandFrame::generic(&[
        0xc6, //
        0x06, 0x6d, 0x06, 0x6d, 0x06, 0x6d, //
        0x00, 0x00, 0x00, 0x00, 0x06, 0x6d, //
        0x06, 0x6d, 0x06, 0x6d, 0x15, 0x19, //
        0x07, 0x00, 0x01, 0x06, 0x6d, 0x06, //
        0x6d, 0x06, 0x6d, 0x00, 0x00, 0x00, //
        0x00, 0x06, 0x6d, 0x06, 0x6d, 0x06, //
        0x6d, 0x15, 0x19, 0x07,
    ]),
    // Gamma A, B, C
    CommandFrame::generic(&[
        0xc7, //
        0x00, 0x09, 0x14, 0x26, 0x32, 0x49, //
        0x3b, 0x52, 0x5f, 0x67, 0x6b, 0x70, //
        0x00, 0x09, 0x14, 0x26, 0x32, 0x49, //
        0x3b, 0x52, 0x5f, 0x67, 0x6b, 0x70,
    ]),
    CommandFrame::generic(&[
        0xc8, //
        0x00, 0x09, 0x14, 0x26, 0x32, 0x49, //
        0x3b, 0x52, 0x5f, 0x67, 0x6b, 0x70, //
        0x00, 0x09, 0x14, 0x26, 0x32, 0x49, //
        0x3b, 0x52, 0x5f, 0x67, 0x6b, 0x70,
    ]),
    CommandFrame::generic(&[
        0xc9, //
        0x00, 0x09, 0x14, 0x26, 0x32, 0x49, //
        0x3b, 0x52, 0x5f, 0x67, 0x6b, 0x70, //
        0x00, 0x09, 0x14, 0x26, 0x32, 0x49, //
        0x3b, 0x52, 0x5f, 0x67, 0x6b, 0x70,
    ]),
    // Panel interface control
    CommandFrame::generic(&[0xcc, 0x09]),
    // Power setting (charge pump)
    CommandFrame::generic(&[
        0xd0, //
        0x00, 0x00, 0x19, 0x18, 0x99, 0x99, //
        0x19, 0x01, 0x89, 0x00, 0x55, 0x19, //
        0x99, 0x01,
    ]),
    // Power setting (switching regulator)
    CommandFrame::generic(&[
        0xd3, //
        0x1b, 0x33, 0xbb, 0xcc, 0xc4, 0x33, //
        0x33, 0x33, 0x00, 0x01, 0x00, 0xa0, //
        0xd8, 0xa0, 0x0d, 0x37, 0x33, 0x44, //
        0x22, 0x70, 0x02, 0x37, 0x03, 0x3d, //
        0xbf, 0x00,
    ]),
    // VCOM setting, written twice
    CommandFrame::generic(&[
        0xd5, //
        0x06, 0x00, 0x00, 0x01, 0x4a, 0x01, //
        0x4a,
    ]),
    CommandFrame::generic(&[
        0xd5, //
        0x06, 0x00, 0x00, 0x01, 0x4a, 0x01, //
        0x4a,
    ]),
    // Address mode: flip both axes
    CommandFrame::dcs(&[dcs::SET_ADDRESS_MODE, 0xc0]),
    CommandFrame::dcs(&[dcs::SET_DISPLAY_ON, 0x00]),
    CommandFrame::dcs(&[dcs::EXIT_SLEEP_MODE, 0x00]),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsi::{FrameKind, Packet, PacketFlags};

    #[test]
    fn test_table_size() {
        assert_eq!(INIT_SEQUENCE.len(), 20);
    }

    #[test]
    fn test_frame_lengths() {
        let lengths: Vec<usize> = INIT_SEQUENCE.iter().map(|f| f.len()).collect();
        assert_eq!(
            lengths,
            vec![2, 2, 2, 7, 3, 35, 8, 23, 41, 25, 25, 25, 2, 15, 27, 8, 8, 2, 2, 2]
        );
    }

    #[test]
    fn test_leading_bytes_in_order() {
        let leading: Vec<u8> = INIT_SEQUENCE.iter().map(|f| f.payload[0]).collect();
        assert_eq!(
            leading,
            vec![
                0xb0, 0x00, 0x00, 0xb3, 0xb6, 0xc1, 0xc2, 0xc4, 0xc6, 0xc7, 0xc8, 0xc9, 0xcc,
                0xd0, 0xd3, 0xd5, 0xd5, 0x36, 0x29, 0x11
            ]
        );
    }

    #[test]
    fn test_frame_kinds() {
        let dcs_positions: Vec<usize> = INIT_SEQUENCE
            .iter()
            .enumerate()
            .filter(|(_, f)| f.kind == FrameKind::DisplayCommandSetWrite)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(dcs_positions, vec![1, 2, 17, 18, 19]);
    }

    #[test]
    fn test_wire_data_types() {
        let types: Vec<u8> = INIT_SEQUENCE
            .iter()
            .map(|f| Packet::new(0, PacketFlags::LOW_POWER, f).unwrap().data_type())
            .collect();
        assert_eq!(
            types,
            vec![
                0x29, 0x05, 0x05, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29, 0x29,
                0x29, 0x29, 0x29, 0x29, 0x15, 0x05, 0x05
            ]
        );
    }

    #[test]
    fn test_vcom_pair_kept() {
        assert_eq!(INIT_SEQUENCE[15], INIT_SEQUENCE[16]);
        assert_eq!(INIT_SEQUENCE[15].payload, &[0xd5, 0x06, 0x00, 0x00, 0x01, 0x4a, 0x01, 0x4a]);
    }

    #[test]
    fn test_trailing_dcs_commands() {
        assert_eq!(INIT_SEQUENCE[17].payload, &[dcs::SET_ADDRESS_MODE, 0xc0]);
        assert_eq!(INIT_SEQUENCE[18].payload[0], dcs::SET_DISPLAY_ON);
        assert_eq!(INIT_SEQUENCE[19].payload[0], dcs::EXIT_SLEEP_MODE);
    }

    #[test]
    fn test_gamma_curves_match() {
        assert_eq!(INIT_SEQUENCE[9].payload[1..], INIT_SEQUENCE[10].payload[1..]);
        assert_eq!(INIT_SEQUENCE[10].payload[1..], INIT_SEQUENCE[11].payload[1..]);
    }
}
