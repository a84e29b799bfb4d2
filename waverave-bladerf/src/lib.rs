/*!

This is a control-path host crate for the [bladeRF][bladerf], made using the
pure-rust [`nusb`] crate for USB interfacing. It turns tuner operations (center
frequency, sample rate, receive channel, LNA gain, transceiver mode) into the
bladeRF's vendor control requests, and decodes what the device reports back.

[bladerf]: https://www.nuand.com/

The standard entry point for this library is [`open_bladerf()`], which will
open the first available bladeRF device.

A [`BladeRf`] is a session with one device. All operations take `&self` and
block the calling thread for at most one control-transfer timeout
([`CONTROL_TIMEOUT`]) per request. Control transfers are serialized internally,
so a `BladeRf` can be shared between a UI thread and a streaming-setup thread.
The session moves through [`SessionState`]: `Stopped`, `Starting`, `Running`,
`Stopping`, and back to `Stopped`.

Here's what configuring and starting a receive session looks like:

```no_run
use waverave_bladerf::{Channel, LnaGain, TunerConfiguration};

fn main() -> anyhow::Result<()> {
    let rf = waverave_bladerf::open_bladerf()?;
    println!("Opened bladeRF {}", rf.info().serial()?);

    // Switch to receive and tune to the default frequency
    rf.start()?;

    // Apply a full configuration: 10 MHz sample rate, RX1, 24 dB of LNA gain,
    // tuned to 162.55 MHz.
    let config = TunerConfiguration {
        frequency: 162_550_000,
        sample_rate_hz: 10_000_000,
        channel: Channel::Rx1,
        lna_gain: LnaGain::G24,
        ..Default::default()
    };
    rf.apply(&config)?;
    println!("{}", rf.status());

    // Shutdown never fails; problems are logged.
    rf.stop();
    Ok(())
}
```

*/

#![warn(missing_docs)]

mod config;
mod consts;
pub mod descriptor;
mod dispatch;
mod error;
pub mod info;
pub mod nios;
pub mod peripheral;
#[cfg(test)]
mod testutil;
mod transport;
mod types;

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::consts::*;
use crate::info::{DeviceStatus, Info};
use crate::peripheral::{Peripheral, PeripheralLink};

pub use crate::config::{TunerConfiguration, corrected_frequency};
pub use crate::consts::{
    CONTROL_TIMEOUT, ControlRequest, DEFAULT_FREQ_HZ, MAX_FREQ_HZ, MIN_FREQ_HZ, OPCODE_REVISION,
    OPCODE_TABLE, PERIPHERAL_TIMEOUT,
};
pub use crate::descriptor::Serial;
pub use crate::dispatch::Dispatcher;
pub use crate::error::{ApplyStep, Error, ErrorKind};
pub use crate::transport::{NusbTransport, UsbTransport};
pub use crate::types::{BandwidthSetting, Channel, LnaGain, Mode, SampleRate, SessionState};

/// A bladeRF device descriptor, which can be opened.
///
/// These are mostly returned from calling [`list_bladerf_devices`], but can
/// also be formed by trying to convert a [`nusb::DeviceInfo`] into one.
pub struct BladeRfDescriptor {
    info: nusb::DeviceInfo,
}

impl BladeRfDescriptor {
    /// Get the serial number of this bladeRF, as a string.
    pub fn serial(&self) -> Option<&str> {
        self.info.serial_number()
    }

    /// Try and open this bladeRF device descriptor.
    pub fn open(self) -> Result<BladeRf, std::io::Error> {
        let device = self.info.open()?;
        #[cfg(not(target_os = "windows"))]
        {
            if device.active_configuration()?.configuration_value() != 1 {
                device.detach_kernel_driver(0)?;
                device.set_configuration(1)?;
            }
        }
        let interface = device.detach_and_claim_interface(0)?;
        tracing::debug!(
            "Claimed bladeRF interface (serial {})",
            self.info.serial_number().unwrap_or("unknown")
        );
        Ok(BladeRf::new(NusbTransport::new(interface)))
    }
}

/// Try and turn any [`nusb::DeviceInfo`] descriptor into a bladeRF, failing
/// if the VID and PID don't match.
impl TryFrom<nusb::DeviceInfo> for BladeRfDescriptor {
    type Error = &'static str;
    fn try_from(value: nusb::DeviceInfo) -> Result<Self, Self::Error> {
        if value.vendor_id() != BLADERF_USB_VID {
            Err("VID doesn't match for bladeRF")
        } else if value.product_id() != BLADERF_USB_PID {
            Err("VID recognized, PID not recognized")
        } else {
            Ok(BladeRfDescriptor { info: value })
        }
    }
}

/// List all available bladeRF devices.
pub fn list_bladerf_devices() -> Result<Vec<BladeRfDescriptor>, std::io::Error> {
    Ok(nusb::list_devices()?
        .filter(|d| d.vendor_id() == BLADERF_USB_VID && d.product_id() == BLADERF_USB_PID)
        .map(|d| BladeRfDescriptor { info: d })
        .collect::<Vec<BladeRfDescriptor>>())
}

/// Open the first detected bladeRF device in the system.
///
/// This is a shortcut for calling [`list_bladerf_devices`] and opening the
/// first one.
pub fn open_bladerf() -> Result<BladeRf, std::io::Error> {
    list_bladerf_devices()?
        .into_iter()
        .next()
        .ok_or_else(|| std::io::Error::other("No bladeRF devices"))?
        .open()
}

/// A bladeRF device session. This is the main struct for talking to the
/// bladeRF.
///
/// Holds the live tuner state (frequency, sample rate, channel, gain, session
/// state) behind a mutex. Every operation that changes device state takes that
/// mutex for the whole exchange, so the cached state always matches what the
/// device last accepted, and readers never observe a half-applied change.
pub struct BladeRf<T: UsbTransport = NusbTransport> {
    pub(crate) dispatch: Dispatcher<T>,
    pub(crate) peripheral: PeripheralLink<T>,
    state: Mutex<DeviceStatus>,
}

impl<T: UsbTransport> BladeRf<T> {
    /// Start a session over an already-opened transport.
    pub fn new(transport: T) -> Self {
        Self {
            peripheral: PeripheralLink::new(transport.clone()),
            dispatch: Dispatcher::new(transport),
            state: Mutex::new(DeviceStatus::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, DeviceStatus> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Access the info commands for the bladeRF.
    pub fn info(&self) -> Info<'_, T> {
        Info::new(self)
    }

    /// Access the peripheral register commands for the bladeRF.
    pub fn peripheral(&self) -> Peripheral<'_, T> {
        Peripheral::new(self)
    }

    /// Access the raw control-request dispatcher.
    ///
    /// Requests sent this way bypass the cached tuner state.
    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatch
    }

    /// Get a snapshot of the current tuner state.
    pub fn status(&self) -> DeviceStatus {
        self.state().clone()
    }

    /// Current sample rate.
    pub fn sample_rate(&self) -> SampleRate {
        self.state().sample_rate
    }

    /// Samples per millisecond at the current sample rate.
    pub fn samples_per_millisecond(&self) -> f32 {
        self.state().samples_per_millisecond
    }

    /// Requested center frequency, in Hz.
    pub fn frequency(&self) -> u64 {
        self.state().frequency_hz
    }

    /// Start the session: switch the transceiver to receive and tune to
    /// [`DEFAULT_FREQ_HZ`].
    ///
    /// The serial number and firmware version are read and logged first;
    /// failing to read them doesn't stop startup. Only a stopped session can
    /// be started.
    pub fn start(&self) -> Result<(), Error> {
        let mut st = self.state();
        if st.session != SessionState::Stopped {
            return Err(Error::InvalidState {
                from: st.session,
                to: SessionState::Starting,
            });
        }
        st.session = SessionState::Starting;

        let info = self.info();
        match info.serial() {
            Ok(serial) => tracing::info!("bladeRF serial number: {serial}"),
            Err(e) => tracing::warn!("Couldn't read bladeRF serial number: {e}"),
        }
        match info.firmware_version() {
            Ok(version) => tracing::info!("bladeRF firmware version: {version}"),
            Err(e) => tracing::warn!("Couldn't read bladeRF firmware version: {e}"),
        }

        let res = match self.mode_locked(&mut st, Mode::Receive) {
            Ok(()) => self.tune_locked(&mut st, DEFAULT_FREQ_HZ).inspect_err(|_| {
                // Receive was accepted, so don't leave the transceiver on
                self.switch_off(&mut st);
            }),
            Err(e) => Err(e),
        };
        match res {
            Ok(()) => {
                st.session = SessionState::Running;
                tracing::info!("bladeRF session started");
                Ok(())
            }
            Err(e) => {
                st.session = SessionState::Stopped;
                tracing::error!("Error on bladeRF startup: {e}");
                Err(Error::Startup(Box::new(e)))
            }
        }
    }

    /// Stop the session by switching the transceiver off.
    ///
    /// This never fails: a transfer error while switching off is logged and
    /// the session still ends up stopped. Stopping a session that isn't
    /// running does nothing.
    pub fn stop(&self) {
        let mut st = self.state();
        if st.session != SessionState::Running {
            tracing::debug!("Ignoring stop while {}", st.session);
            return;
        }
        st.session = SessionState::Stopping;
        self.switch_off(&mut st);
        st.session = SessionState::Stopped;
        tracing::info!("bladeRF session stopped");
    }

    fn switch_off(&self, st: &mut DeviceStatus) {
        if let Err(e) = self.mode_locked(st, Mode::Off) {
            tracing::error!("Error while setting bladeRF mode to off: {e}");
        }
    }

    /// Set the transceiver mode.
    pub fn set_mode(&self, mode: Mode) -> Result<(), Error> {
        self.mode_locked(&mut self.state(), mode)
    }

    fn mode_locked(&self, st: &mut DeviceStatus, mode: Mode) -> Result<(), Error> {
        self.dispatch
            .write_bytes(ControlRequest::SetTransceiverMode, mode.code(), 0, &[])?;
        st.mode = mode;
        Ok(())
    }

    /// Tune to a center frequency in Hz.
    ///
    /// The frequency must be within [`MIN_FREQ_HZ`]..=[`MAX_FREQ_HZ`]. Out of
    /// range values are rejected without talking to the device. The current
    /// frequency correction is applied afterwards, and the corrected frequency
    /// is clamped to the same band.
    pub fn set_frequency(&self, freq_hz: u64) -> Result<(), Error> {
        self.tune_locked(&mut self.state(), freq_hz)
    }

    fn tune_locked(&self, st: &mut DeviceStatus, freq_hz: u64) -> Result<(), Error> {
        const ONE_MHZ: u64 = 1_000_000;
        #[repr(C)]
        #[derive(Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
        struct FreqParams {
            mhz: u32,
            hz: u32,
        }

        if !FREQ_RANGE.contains(&freq_hz) {
            return Err(Error::TuningRange {
                range: FREQ_RANGE,
                val: freq_hz,
            });
        }
        let tuned =
            corrected_frequency(freq_hz, st.frequency_correction).clamp(MIN_FREQ_HZ, MAX_FREQ_HZ);

        let params = FreqParams {
            mhz: ((tuned / ONE_MHZ) as u32).to_le(),
            hz: ((tuned % ONE_MHZ) as u32).to_le(),
        };
        self.dispatch
            .write_struct(ControlRequest::SetFreq, 0, 0, &params)?;
        st.frequency_hz = freq_hz;
        st.tuned_frequency_hz = tuned;
        Ok(())
    }

    /// Set the reference clock error in ppm and retune the current frequency
    /// to match.
    pub fn set_frequency_correction(&self, ppm: f64) -> Result<(), Error> {
        let mut st = self.state();
        let previous = st.frequency_correction;
        st.frequency_correction = ppm;
        let freq_hz = st.frequency_hz;
        if let Err(e) = self.tune_locked(&mut st, freq_hz) {
            st.frequency_correction = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Enable or disable automatic PPM correction by the sample pipeline.
    pub fn set_auto_ppm(&self, enable: bool) {
        self.state().auto_ppm = enable;
    }

    /// Set the sample rate, in Hz.
    ///
    /// Rates off the [`SampleRate`] ladder are replaced with
    /// [`SampleRate::DEFAULT`], with a warning. Returns the rate actually
    /// used.
    pub fn set_sample_rate(&self, rate_hz: u32) -> Result<SampleRate, Error> {
        let rate = SampleRate::coerce(rate_hz);
        self.rate_locked(&mut self.state(), rate)?;
        Ok(rate)
    }

    fn rate_locked(&self, st: &mut DeviceStatus, rate: SampleRate) -> Result<(), Error> {
        #[repr(C)]
        #[derive(Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
        struct FracRateParams {
            freq_hz: u32,
            divider: u32,
        }

        let params = FracRateParams {
            freq_hz: rate.hz().to_le(),
            divider: 1u32.to_le(),
        };
        self.dispatch
            .write_struct(ControlRequest::SetSampleRate, 0, 0, &params)?;
        st.sample_rate = rate;
        st.samples_per_millisecond = rate.samples_per_millisecond();
        Ok(())
    }

    /// Select the receive channel.
    pub fn set_channel(&self, channel: Channel) -> Result<(), Error> {
        self.channel_locked(&mut self.state(), channel)
    }

    fn channel_locked(&self, st: &mut DeviceStatus, channel: Channel) -> Result<(), Error> {
        self.dispatch
            .write_bytes(ControlRequest::SetChannel, channel.code(), 0, &[])?;
        st.channel = channel;
        Ok(())
    }

    /// Set the LNA gain.
    ///
    /// The device acknowledges with 1; anything else is an error naming the
    /// gain that was attempted.
    pub fn set_lna_gain(&self, gain: LnaGain) -> Result<(), Error> {
        self.gain_locked(&mut self.state(), gain)
    }

    fn gain_locked(&self, st: &mut DeviceStatus, gain: LnaGain) -> Result<(), Error> {
        let ack = self
            .dispatch
            .read_primitive(ControlRequest::SetLnaGain, 0, gain.db() as u16, 1)?;
        if ack != 1 {
            return Err(Error::LnaGainRejected { gain, ack });
        }
        st.lna_gain = gain;
        Ok(())
    }

    /// Set the RF front-end filter bandwidth.
    ///
    /// The sample rate normally picks the filter on its own; use this to
    /// override it afterwards.
    pub fn set_bandwidth(&self, bandwidth: BandwidthSetting) -> Result<(), Error> {
        let _st = self.state();
        self.dispatch.write_bytes(
            ControlRequest::SetBandwidth,
            bandwidth.low_word(),
            bandwidth.high_word(),
            &[],
        )
    }

    /// Open a receive channel for streaming.
    pub fn open_channel(&self, channel: Channel) -> Result<(), Error> {
        let _st = self.state();
        self.dispatch
            .write_bytes(ControlRequest::OpenChannel, channel.code(), 0, &[])
    }

    /// Reset the bladeRF, which loses all its tuner settings. Only a stopped
    /// session can be reset; call [`stop`][Self::stop] first.
    pub fn reset(&self) -> Result<(), Error> {
        let mut st = self.state();
        if st.session != SessionState::Stopped {
            return Err(Error::InvalidState {
                from: st.session,
                to: SessionState::Stopped,
            });
        }
        self.dispatch.write_bytes(ControlRequest::Reset, 0, 0, &[])?;
        let correction = st.frequency_correction;
        let auto_ppm = st.auto_ppm;
        *st = DeviceStatus {
            frequency_correction: correction,
            auto_ppm,
            ..DeviceStatus::default()
        };
        Ok(())
    }

    /// Apply a tuner configuration.
    ///
    /// Runs, in order: sample rate, channel, LNA gain, then frequency (with
    /// the configuration's correction). A legacy sample rate is replaced with
    /// [`SampleRate::DEFAULT`] first.
    ///
    /// The first failing step stops the sequence with
    /// [`Error::Configuration`], naming the step. Steps that already
    /// succeeded are *not* rolled back.
    pub fn apply(&self, config: &TunerConfiguration) -> Result<(), Error> {
        let step = |step: ApplyStep| {
            move |e: Error| Error::Configuration {
                step,
                source: Box::new(e),
            }
        };

        let mut st = self.state();
        let rate = SampleRate::coerce(config.sample_rate_hz);
        self.rate_locked(&mut st, rate)
            .map_err(step(ApplyStep::SampleRate))?;
        self.channel_locked(&mut st, config.channel)
            .map_err(step(ApplyStep::Channel))?;
        self.gain_locked(&mut st, config.lna_gain)
            .map_err(step(ApplyStep::LnaGain))?;

        let previous = st.frequency_correction;
        st.frequency_correction = config.frequency_correction;
        if let Err(e) = self.tune_locked(&mut st, config.frequency) {
            st.frequency_correction = previous;
            return Err(step(ApplyStep::Frequency)(e));
        }
        st.auto_ppm = config.auto_ppm;
        tracing::info!(
            "Applied tuner configuration: {} Hz, {}, {}, {}",
            config.frequency,
            rate,
            config.channel,
            config.lna_gain
        );
        Ok(())
    }

    /// Produce a configuration matching the current tuner state, for
    /// persisting.
    pub fn save(&self) -> TunerConfiguration {
        let st = self.state();
        TunerConfiguration {
            frequency: st.frequency_hz,
            sample_rate_hz: st.sample_rate.hz(),
            channel: st.channel,
            lna_gain: st.lna_gain,
            frequency_correction: st.frequency_correction,
            auto_ppm: st.auto_ppm,
        }
    }
}
