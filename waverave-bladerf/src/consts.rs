use std::ops::Range;
use std::time::Duration;

pub const BLADERF_USB_VID: u16 = 0x2CF0;
pub const BLADERF_USB_PID: u16 = 0x5246;

pub const PERIPHERAL_EP_OUT: u8 = 0x02;
pub const PERIPHERAL_EP_IN: u8 = 0x82;

/// Timeout applied to every control transfer.
pub const CONTROL_TIMEOUT: Duration = Duration::from_millis(1000);

/// Timeout applied to each half of a peripheral packet exchange.
pub const PERIPHERAL_TIMEOUT: Duration = Duration::from_millis(250);

/// Lowest tunable frequency, in Hz.
pub const MIN_FREQ_HZ: u64 = 47_000_000;
/// Highest tunable frequency, in Hz.
pub const MAX_FREQ_HZ: u64 = 6_000_000_000;
pub(crate) const FREQ_RANGE: Range<u64> = Range {
    start: MIN_FREQ_HZ,
    end: MAX_FREQ_HZ + 1,
};

/// Frequency tuned on session start.
pub const DEFAULT_FREQ_HZ: u64 = 101_100_000;

/// Length of the part-id / serial-number blob.
pub const SERIAL_BLOB_LEN: usize = 24;

/// Length of the firmware version string read.
pub const VERSION_STRING_LEN: usize = 33;

/// Revision of the vendor request table in [`OPCODE_TABLE`].
pub const OPCODE_REVISION: u16 = 1;

/// Logical vendor requests understood by the device firmware.
///
/// The raw opcode of each request comes from [`OPCODE_TABLE`], never from the
/// enum discriminant.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlRequest {
    OpenChannel,
    SetChannel,
    BoardIdRead,
    SetSampleRate,
    BoardPartidSerialnoRead,
    SetLnaGain,
    VersionStringRead,
    SetBandwidth,
    SetTransceiverMode,
    SetFreq,
    Reset,
}

/// Opcode table for protocol revision 1, indexed by [`ControlRequest`].
pub const OPCODE_TABLE: [(ControlRequest, u8); 11] = [
    (ControlRequest::OpenChannel, 0x01),
    (ControlRequest::SetChannel, 0x02),
    (ControlRequest::BoardIdRead, 0x03),
    (ControlRequest::SetSampleRate, 0x05),
    (ControlRequest::BoardPartidSerialnoRead, 0x06),
    (ControlRequest::SetLnaGain, 0x07),
    (ControlRequest::VersionStringRead, 0x09),
    (ControlRequest::SetBandwidth, 0x10),
    (ControlRequest::SetTransceiverMode, 0x11),
    (ControlRequest::SetFreq, 0x12),
    (ControlRequest::Reset, 105),
];

const fn opcode_table_is_sound() -> bool {
    let mut i = 0;
    while i < OPCODE_TABLE.len() {
        if OPCODE_TABLE[i].0 as usize != i {
            return false;
        }
        let mut j = i + 1;
        while j < OPCODE_TABLE.len() {
            if OPCODE_TABLE[i].1 == OPCODE_TABLE[j].1 {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const _: () = assert!(
    opcode_table_is_sound(),
    "opcode table must be in enum order with unique opcodes"
);

impl ControlRequest {
    /// Raw vendor request code sent on the wire.
    pub const fn opcode(self) -> u8 {
        OPCODE_TABLE[self as usize].1
    }
}

impl std::fmt::Display for ControlRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenChannel => f.write_str("OPEN_CHANNEL"),
            Self::SetChannel => f.write_str("SET_CHANNEL"),
            Self::BoardIdRead => f.write_str("BOARD_ID_READ"),
            Self::SetSampleRate => f.write_str("SET_SAMPLE_RATE"),
            Self::BoardPartidSerialnoRead => f.write_str("BOARD_PARTID_SERIALNO_READ"),
            Self::SetLnaGain => f.write_str("SET_LNA_GAIN"),
            Self::VersionStringRead => f.write_str("VERSION_STRING_READ"),
            Self::SetBandwidth => f.write_str("SET_BANDWIDTH"),
            Self::SetTransceiverMode => f.write_str("SET_TRANSCEIVER_MODE"),
            Self::SetFreq => f.write_str("SET_FREQUENCY"),
            Self::Reset => f.write_str("RESET"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcodes_follow_table() {
        assert_eq!(ControlRequest::OpenChannel.opcode(), 0x01);
        assert_eq!(ControlRequest::SetSampleRate.opcode(), 0x05);
        assert_eq!(ControlRequest::SetFreq.opcode(), 0x12);
        assert_eq!(ControlRequest::Reset.opcode(), 105);
    }

    #[test]
    fn frequency_range_is_inclusive() {
        assert!(FREQ_RANGE.contains(&MIN_FREQ_HZ));
        assert!(FREQ_RANGE.contains(&MAX_FREQ_HZ));
        assert!(!FREQ_RANGE.contains(&(MAX_FREQ_HZ + 1)));
        assert!(FREQ_RANGE.contains(&DEFAULT_FREQ_HZ));
    }
}
