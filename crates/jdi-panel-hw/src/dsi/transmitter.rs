//! Ordered command transmission over a [`DsiHost`].

use super::protocol::{dcs, CommandFrame, Packet, PacketFlags};
use super::{DsiHost, ModeFlags};
use crate::error::TxError;
use tracing::{debug, error};

/// Sends command frames to the panel, one packet per frame.
pub struct CommandTransmitter<H> {
    host: H,
    channel: u8,
    mode_flags: ModeFlags,
}

impl<H: DsiHost> CommandTransmitter<H> {
    /// Creates a transmitter on the given virtual channel.
    pub fn new(host: H, channel: u8, mode_flags: ModeFlags) -> Self {
        Self {
            host,
            channel,
            mode_flags,
        }
    }

    /// Switches low-power transmission on or off for subsequent frames.
    pub fn set_low_power(&mut self, enabled: bool) {
        self.mode_flags.set(ModeFlags::LPM, enabled);
    }

    pub fn low_power(&self) -> bool {
        self.mode_flags.contains(ModeFlags::LPM)
    }

    pub fn mode_flags(&self) -> ModeFlags {
        self.mode_flags
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Releases the underlying host.
    pub fn into_host(self) -> H {
        self.host
    }

    /// Frames and sends a single command.
    pub fn send(&mut self, frame: &CommandFrame<'_>) -> Result<(), TxError> {
        let flags = if self.low_power() {
            PacketFlags::LOW_POWER
        } else {
            PacketFlags::empty()
        };
        let packet = Packet::new(self.channel, flags, frame)?;

        self.host
            .transfer(&packet)
            .map_err(|e| TxError::Transfer {
                index: None,
                source: Box::new(e),
            })?;

        debug!("tx {}", packet);
        Ok(())
    }

    /// Sends a parameterless DCS command.
    pub fn dcs_command(&mut self, opcode: u8) -> Result<(), TxError> {
        self.send(&CommandFrame::dcs(&[opcode]))
    }

    pub fn soft_reset(&mut self) -> Result<(), TxError> {
        self.dcs_command(dcs::SOFT_RESET)
    }

    pub fn set_display_on(&mut self) -> Result<(), TxError> {
        self.dcs_command(dcs::SET_DISPLAY_ON)
    }

    pub fn set_display_off(&mut self) -> Result<(), TxError> {
        self.dcs_command(dcs::SET_DISPLAY_OFF)
    }

    pub fn enter_sleep_mode(&mut self) -> Result<(), TxError> {
        self.dcs_command(dcs::ENTER_SLEEP_MODE)
    }

    /// Sends `sequence` in order, stopping at the first failure.
    ///
    /// Returns the number of frames sent. On failure the error carries the
    /// 0-based index of the frame that failed; no later frame is attempted.
    pub fn replay(&mut self, sequence: &[CommandFrame<'_>]) -> Result<usize, TxError> {
        for (index, frame) in sequence.iter().enumerate() {
            if let Err(e) = self.send(frame) {
                error!("failed to run seq {}: {}", index, e);
                return Err(e.at(index));
            }
        }
        Ok(sequence.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Event, Faults, SimHost, Trace};

    fn transmitter(faults: Faults) -> (CommandTransmitter<SimHost>, Trace) {
        let trace = Trace::default();
        let host = SimHost::new(trace.clone(), faults);
        (CommandTransmitter::new(host, 0, ModeFlags::VIDEO), trace)
    }

    fn sent(trace: &Trace) -> Vec<Vec<u8>> {
        trace
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Packet { payload, .. } => Some(payload),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_low_power_flag_reaches_packet() {
        let (mut tx, trace) = transmitter(Faults::default());
        tx.set_low_power(true);
        tx.set_display_on().unwrap();
        tx.set_low_power(false);
        tx.set_display_off().unwrap();

        let flags: Vec<_> = trace
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Packet { flags, .. } => Some(flags),
                _ => None,
            })
            .collect();
        assert_eq!(flags, vec![0x01, 0x00]);
        assert!(!tx.low_power());
        assert!(tx.mode_flags().contains(ModeFlags::VIDEO));
    }

    #[test]
    fn test_replay_sends_in_order() {
        let (mut tx, trace) = transmitter(Faults::default());
        let frames = [
            CommandFrame::generic(&[0xb0, 0x04]),
            CommandFrame::dcs(&[0x36, 0xc0]),
            CommandFrame::generic(&[0xcc, 0x09]),
        ];
        assert_eq!(tx.replay(&frames).unwrap(), 3);
        assert_eq!(
            sent(&trace),
            vec![vec![0xb0, 0x04], vec![0x36, 0xc0], vec![0xcc, 0x09]]
        );
    }

    #[test]
    fn test_replay_stops_at_first_failure() {
        let (mut tx, trace) = transmitter(Faults {
            fail_transfer: Some(1),
            ..Faults::default()
        });
        let frames = [
            CommandFrame::generic(&[0xb0, 0x04]),
            CommandFrame::generic(&[0xb3, 0x14]),
            CommandFrame::generic(&[0xb6, 0x3a]),
        ];
        let err = tx.replay(&frames).unwrap_err();
        assert_eq!(err.index(), Some(1));
        assert_eq!(sent(&trace), vec![vec![0xb0, 0x04]]);
    }

    #[test]
    fn test_send_outside_replay_has_no_index() {
        let (mut tx, _trace) = transmitter(Faults {
            fail_transfer: Some(0),
            ..Faults::default()
        });
        let err = tx.soft_reset().unwrap_err();
        assert_eq!(err.index(), None);
    }
}
