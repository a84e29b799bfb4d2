use std::ops::Range;

use crate::{ControlRequest, LnaGain, SessionState, nios::NiosTarget};

/// An error from operating the bladeRF.
///
/// Errors fall into four [kinds][ErrorKind]:
///
/// - Transport: `Transfer`, `ShortTransfer`, `ReturnData`, `LnaGainRejected`,
///   and `NiosAccess` mean the device was reached but the exchange failed.
///   Nothing is retried.
/// - Protocol: `NiosMagic` and `NiosTarget` mean a peripheral packet came back
///   with bytes we don't understand. Nothing in the packet is trusted.
/// - Validation: `TuningRange`, `InvalidParameter`, `UnknownCode`, and
///   `InvalidState` mean the arguments were rejected before any transfer was
///   attempted.
/// - Configuration: `Configuration` means [`apply`][crate::BladeRf::apply]
///   stopped partway. Steps before the failing one stay applied.
///
/// `Startup` takes the kind of the error it wraps.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Transfer error from `nusb`.
    #[error("USB transfer error")]
    Transfer(#[from] nusb::transfer::TransferError),

    /// The device returned fewer bytes than the request needs.
    #[error("{request} returned {actual} bytes, expected {expected}")]
    #[allow(missing_docs)]
    ShortTransfer {
        request: ControlRequest,
        expected: usize,
        actual: usize,
    },

    /// Returned data from the bladeRF didn't make any sense.
    #[error("Invalid return data")]
    ReturnData,

    /// The device did not acknowledge an LNA gain change.
    #[error("Couldn't set LNA gain to {gain} (device replied {ack})")]
    #[allow(missing_docs)]
    LnaGainRejected { gain: LnaGain, ack: i32 },

    /// A mandatory step of session startup failed.
    #[error("Failed to start the bladeRF session")]
    Startup(#[source] Box<Error>),

    /// A peripheral packet didn't start with the magic byte.
    #[error("Peripheral packet has bad magic byte 0x{0:02x}")]
    NiosMagic(u8),

    /// A peripheral packet named a target we don't know.
    #[error("Peripheral packet has unknown target id 0x{0:02x}")]
    NiosTarget(u8),

    /// The device answered a peripheral access without the success flag.
    #[error("Peripheral access to {target:?} address 0x{addr:02x} failed")]
    #[allow(missing_docs)]
    NiosAccess { target: NiosTarget, addr: u8 },

    /// The provided tuning frequency is out of range.
    #[error("Tuning Value ({val} Hz) out of range ({}..={} Hz)", .range.start, .range.end - 1)]
    #[allow(missing_docs)]
    TuningRange { range: Range<u64>, val: u64 },

    /// Some argument to a function is invalid in a way not easily expressed as
    /// a range.
    #[error("Invalid Parameter: {0}")]
    InvalidParameter(&'static str),

    /// A raw code doesn't map to any entry of a fixed table.
    #[error("Unknown {kind} code {code}")]
    #[allow(missing_docs)]
    UnknownCode { kind: &'static str, code: u32 },

    /// The session can't make the requested transition from its current state.
    #[error("Can't go to {to} while {from}")]
    #[allow(missing_docs)]
    InvalidState {
        from: SessionState,
        to: SessionState,
    },

    /// Applying a configuration stopped at `step`.
    #[error("Error while applying tuner configuration ({step} step)")]
    #[allow(missing_docs)]
    Configuration {
        step: ApplyStep,
        #[source]
        source: Box<Error>,
    },
}

/// The broad class of an [`Error`].
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Protocol,
    Validation,
    Configuration,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transfer(_)
            | Self::ShortTransfer { .. }
            | Self::ReturnData
            | Self::LnaGainRejected { .. }
            | Self::NiosAccess { .. } => ErrorKind::Transport,
            Self::Startup(inner) => inner.kind(),
            Self::NiosMagic(_) | Self::NiosTarget(_) => ErrorKind::Protocol,
            Self::TuningRange { .. }
            | Self::InvalidParameter(_)
            | Self::UnknownCode { .. }
            | Self::InvalidState { .. } => ErrorKind::Validation,
            Self::Configuration { .. } => ErrorKind::Configuration,
        }
    }
}

/// A step of [`BladeRf::apply`][crate::BladeRf::apply], in the order they run.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyStep {
    SampleRate,
    Channel,
    LnaGain,
    Frequency,
}

impl std::fmt::Display for ApplyStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SampleRate => f.write_str("sample rate"),
            Self::Channel => f.write_str("channel"),
            Self::LnaGain => f.write_str("LNA gain"),
            Self::Frequency => f.write_str("frequency"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nusb::transfer::TransferError;

    #[test]
    fn kinds() {
        assert_eq!(Error::from(TransferError::Stall).kind(), ErrorKind::Transport);
        assert_eq!(Error::NiosTarget(0x42).kind(), ErrorKind::Protocol);
        let wrapped = Error::Configuration {
            step: ApplyStep::Channel,
            source: Box::new(Error::Transfer(TransferError::Disconnected)),
        };
        assert_eq!(wrapped.kind(), ErrorKind::Configuration);
        assert!(wrapped.to_string().contains("channel"));
    }

    #[test]
    fn startup_takes_inner_kind() {
        let transfer = Error::Startup(Box::new(Error::Transfer(TransferError::Stall)));
        assert_eq!(transfer.kind(), ErrorKind::Transport);
        let range = Error::Startup(Box::new(Error::TuningRange {
            range: crate::consts::FREQ_RANGE,
            val: 1,
        }));
        assert_eq!(range.kind(), ErrorKind::Validation);
    }

    #[test]
    fn tuning_range_message() {
        let err = Error::TuningRange {
            range: crate::consts::FREQ_RANGE,
            val: 10,
        };
        assert_eq!(
            err.to_string(),
            "Tuning Value (10 Hz) out of range (47000000..=6000000000 Hz)"
        );
    }
}
