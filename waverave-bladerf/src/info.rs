//! Get information about a bladeRF board.
//!
//! This module contains the [`Info`] struct for accessing identification data
//! from the bladeRF, which can be used to get:
//!
//! - The board's [serial number and part id][Serial] with [Info::serial].
//! - The firmware version string with [Info::firmware_version].
//! - The board identifier byte with [Info::board_id].
//!
//! It also holds [`DeviceStatus`], the snapshot returned by
//! [`BladeRf::status`] for display.
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! let rf = waverave_bladerf::open_bladerf()?;
//! let info = rf.info();
//!
//! println!("Serial: {}", info.serial()?);
//! println!("Firmware: {}", info.firmware_version()?);
//! # Ok(())
//! # }
//! ```
use crate::consts::{SERIAL_BLOB_LEN, VERSION_STRING_LEN};
use crate::descriptor::{self, Serial};
use crate::transport::UsbTransport;
use crate::{
    BladeRf, Channel, ControlRequest, Error, LnaGain, Mode, SampleRate, SessionState,
};

/// Info-gathering operations for the bladeRF.
///
/// Borrows the device while doing operations.
pub struct Info<'a, T: UsbTransport> {
    inner: &'a BladeRf<T>,
}

impl<'a, T: UsbTransport> Info<'a, T> {
    pub(crate) fn new(inner: &'a BladeRf<T>) -> Info<'a, T> {
        Self { inner }
    }

    /// Revision of the vendor request table this driver speaks.
    pub fn opcode_revision(&self) -> u16 {
        crate::OPCODE_REVISION
    }

    /// Read the part id and serial number.
    pub fn serial(&self) -> Result<Serial, Error> {
        let blob = self.inner.dispatch.read_bytes(
            ControlRequest::BoardPartidSerialnoRead,
            0,
            0,
            SERIAL_BLOB_LEN,
        )?;
        if blob.len() < SERIAL_BLOB_LEN {
            return Err(Error::ShortTransfer {
                request: ControlRequest::BoardPartidSerialnoRead,
                expected: SERIAL_BLOB_LEN,
                actual: blob.len(),
            });
        }
        Serial::parse(&blob)
    }

    /// Get the firmware version as a string.
    pub fn firmware_version(&self) -> Result<String, Error> {
        let resp = self.inner.dispatch.read_bytes(
            ControlRequest::VersionStringRead,
            0,
            0,
            VERSION_STRING_LEN,
        )?;
        descriptor::firmware_version(&resp)
    }

    /// Get the board hardware id.
    pub fn board_id(&self) -> Result<u8, Error> {
        let id = self
            .inner
            .dispatch
            .read_primitive(ControlRequest::BoardIdRead, 0, 0, 1)?;
        Ok(id as u8)
    }
}

/// A snapshot of the controller's live state.
///
/// Returned by [`BladeRf::status`]; a UI can poll this to reflect changes
/// made through any other path.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceStatus {
    /// Where the session is in its lifecycle.
    pub session: SessionState,
    /// Last transceiver mode the device accepted.
    pub mode: Mode,
    /// Requested center frequency in Hz.
    pub frequency_hz: u64,
    /// Frequency actually programmed, after correction.
    pub tuned_frequency_hz: u64,
    /// Current sample rate.
    pub sample_rate: SampleRate,
    /// Samples per millisecond at the current rate, for sizing sample
    /// buffers.
    pub samples_per_millisecond: f32,
    /// Current receive channel.
    pub channel: Channel,
    /// Current LNA gain.
    pub lna_gain: LnaGain,
    /// Reference clock error, in parts per million.
    pub frequency_correction: f64,
    /// Whether automatic PPM correction is enabled.
    pub auto_ppm: bool,
}

impl Default for DeviceStatus {
    fn default() -> Self {
        let rate = SampleRate::DEFAULT;
        Self {
            session: SessionState::Stopped,
            mode: Mode::Off,
            frequency_hz: crate::DEFAULT_FREQ_HZ,
            tuned_frequency_hz: crate::DEFAULT_FREQ_HZ,
            sample_rate: rate,
            samples_per_millisecond: rate.samples_per_millisecond(),
            channel: Channel::Rx0,
            lna_gain: LnaGain::G16,
            frequency_correction: 0.0,
            auto_ppm: true,
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Session: {}", self.session)?;
        writeln!(f, "Mode: {}", self.mode)?;
        writeln!(
            f,
            "Frequency: {:.6} MHz (tuned {:.6} MHz, {} ppm)",
            self.frequency_hz as f64 / 1e6,
            self.tuned_frequency_hz as f64 / 1e6,
            self.frequency_correction
        )?;
        writeln!(f, "Sample rate: {}", self.sample_rate)?;
        writeln!(f, "Channel: {}", self.channel)?;
        write!(f, "LNA gain: {}", self.lna_gain)
    }
}
