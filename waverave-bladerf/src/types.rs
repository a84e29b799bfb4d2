//! Fixed tables of device settings.
//!
//! Every setting here maps to exactly one raw value on the wire. Lookups from
//! raw values return `None` for anything outside the table, so unmapped codes
//! never reach the device.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Transceiver operating mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Transceiver idle.
    Off,
    /// Receiving samples.
    Receive,
    /// Transmitting samples.
    Transmit,
    /// Firmware self-test.
    SelfTest,
}

impl Mode {
    /// Raw mode code sent with `SET_TRANSCEIVER_MODE`.
    pub fn code(self) -> u16 {
        match self {
            Self::Off => 0x00,
            Self::Receive => 0x01,
            Self::Transmit => 0x02,
            Self::SelfTest => 0x33,
        }
    }

    /// Look up a mode by its raw code.
    pub fn from_code(code: u16) -> Option<Self> {
        [Self::Off, Self::Receive, Self::Transmit, Self::SelfTest]
            .into_iter()
            .find(|m| m.code() == code)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => f.write_str("Off"),
            Self::Receive => f.write_str("Receive"),
            Self::Transmit => f.write_str("Transmit"),
            Self::SelfTest => f.write_str("Self-test"),
        }
    }
}

/// Receive channel selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// First receive channel.
    #[default]
    Rx0,
    /// Second receive channel.
    Rx1,
}

impl Channel {
    /// Raw channel code sent with `SET_CHANNEL`.
    pub fn code(self) -> u16 {
        match self {
            Self::Rx0 => 0x00,
            Self::Rx1 => 0x01,
        }
    }

    /// Look up a channel by its raw code.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x00 => Some(Self::Rx0),
            0x01 => Some(Self::Rx1),
            _ => None,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rx0 => f.write_str("RX0"),
            Self::Rx1 => f.write_str("RX1"),
        }
    }
}

/// RF front-end filter bandwidth.
///
/// [`BandwidthSetting::Auto`] lets the firmware pick the filter from the
/// sample rate.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BandwidthSetting {
    Auto,
    F1_75,
    F2_50,
    F3_50,
    F5_00,
    F5_50,
    F6_00,
    F7_00,
    F8_00,
    F9_00,
    F10_00,
    F12_00,
    F14_00,
    F15_00,
    F20_00,
    F24_00,
    F28_00,
}

impl BandwidthSetting {
    /// All settings, narrowest first, with `Auto` leading.
    pub const ALL: [BandwidthSetting; 17] = [
        Self::Auto,
        Self::F1_75,
        Self::F2_50,
        Self::F3_50,
        Self::F5_00,
        Self::F5_50,
        Self::F6_00,
        Self::F7_00,
        Self::F8_00,
        Self::F9_00,
        Self::F10_00,
        Self::F12_00,
        Self::F14_00,
        Self::F15_00,
        Self::F20_00,
        Self::F24_00,
        Self::F28_00,
    ];

    /// Filter bandwidth in Hz. `Auto` is 0.
    pub fn hz(self) -> u32 {
        match self {
            Self::Auto => 0,
            Self::F1_75 => 1_750_000,
            Self::F2_50 => 2_500_000,
            Self::F3_50 => 3_500_000,
            Self::F5_00 => 5_000_000,
            Self::F5_50 => 5_500_000,
            Self::F6_00 => 6_000_000,
            Self::F7_00 => 7_000_000,
            Self::F8_00 => 8_000_000,
            Self::F9_00 => 9_000_000,
            Self::F10_00 => 10_000_000,
            Self::F12_00 => 12_000_000,
            Self::F14_00 => 14_000_000,
            Self::F15_00 => 15_000_000,
            Self::F20_00 => 20_000_000,
            Self::F24_00 => 24_000_000,
            Self::F28_00 => 28_000_000,
        }
    }

    /// Upper 16 bits of the bandwidth, sent as the request index.
    pub fn high_word(self) -> u16 {
        (self.hz() >> 16) as u16
    }

    /// Lower 16 bits of the bandwidth, sent as the request value.
    pub fn low_word(self) -> u16 {
        (self.hz() & 0xFFFF) as u16
    }

    /// Look up a setting by its exact bandwidth in Hz.
    pub fn from_hz(hz: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.hz() == hz)
    }
}

impl std::fmt::Display for BandwidthSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => f.write_str("AUTO"),
            b => write!(f, "{:.2} MHz", b.hz() as f64 / 1e6),
        }
    }
}

/// The ladder of supported sample rates.
///
/// Any rate outside this ladder is a legacy value and gets replaced with
/// [`SampleRate::DEFAULT`] before it is used.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleRate {
    R1_75,
    R2_5,
    R3_5,
    R5_0,
    R5_5,
    R6_0,
    R7_0,
    R8_0,
    R9_0,
    R10_0,
    R12_0,
    R14_0,
    R15_0,
    R20_0,
}

impl SampleRate {
    /// Rate substituted for anything outside the ladder.
    pub const DEFAULT: SampleRate = SampleRate::R5_0;

    /// Every valid rate, slowest first.
    pub const ALL: [SampleRate; 14] = [
        Self::R1_75,
        Self::R2_5,
        Self::R3_5,
        Self::R5_0,
        Self::R5_5,
        Self::R6_0,
        Self::R7_0,
        Self::R8_0,
        Self::R9_0,
        Self::R10_0,
        Self::R12_0,
        Self::R14_0,
        Self::R15_0,
        Self::R20_0,
    ];

    /// Front-end filter paired with this rate.
    pub fn filter(self) -> BandwidthSetting {
        use BandwidthSetting as B;
        match self {
            Self::R1_75 => B::F1_75,
            Self::R2_5 => B::F2_50,
            Self::R3_5 => B::F3_50,
            Self::R5_0 => B::F5_00,
            Self::R5_5 => B::F5_50,
            Self::R6_0 => B::F6_00,
            Self::R7_0 => B::F7_00,
            Self::R8_0 => B::F8_00,
            Self::R9_0 => B::F9_00,
            Self::R10_0 => B::F10_00,
            Self::R12_0 => B::F12_00,
            Self::R14_0 => B::F14_00,
            Self::R15_0 => B::F15_00,
            Self::R20_0 => B::F20_00,
        }
    }

    /// Sample rate in Hz.
    ///
    /// Every ladder rate has a filter of the same width, so the rate is read
    /// off the paired filter.
    pub fn hz(self) -> u32 {
        self.filter().hz()
    }

    /// Human-readable label, e.g. `"5.000 MHz"`.
    pub fn label(self) -> String {
        format!("{:.3} MHz", self.hz() as f64 / 1e6)
    }

    /// Look up a ladder rate by its exact value in Hz.
    pub fn from_hz(hz: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.hz() == hz)
    }

    /// Map any requested rate onto the ladder, substituting
    /// [`SampleRate::DEFAULT`] for legacy values.
    pub fn coerce(hz: u32) -> Self {
        match Self::from_hz(hz) {
            Some(rate) => rate,
            None => {
                tracing::warn!(
                    "Changing legacy sample rate setting [{hz} Hz] to {}",
                    Self::DEFAULT
                );
                Self::DEFAULT
            }
        }
    }

    /// Samples delivered per millisecond at this rate.
    pub fn samples_per_millisecond(self) -> f32 {
        self.hz() as f32 / 1000.0
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for SampleRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Receive LNA gain steps, in dB.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum LnaGain {
    G0,
    G8,
    #[default]
    G16,
    G24,
    G32,
    G40,
    G50,
    G60,
    G70,
    G75,
}

impl LnaGain {
    /// Every gain step, lowest first.
    pub const ALL: [LnaGain; 10] = [
        Self::G0,
        Self::G8,
        Self::G16,
        Self::G24,
        Self::G32,
        Self::G40,
        Self::G50,
        Self::G60,
        Self::G70,
        Self::G75,
    ];

    /// Gain in dB, also the raw value sent to the device.
    pub fn db(self) -> u8 {
        match self {
            Self::G0 => 0,
            Self::G8 => 8,
            Self::G16 => 16,
            Self::G24 => 24,
            Self::G32 => 32,
            Self::G40 => 40,
            Self::G50 => 50,
            Self::G60 => 60,
            Self::G70 => 70,
            Self::G75 => 75,
        }
    }

    /// Look up a gain step by its exact value in dB.
    pub fn from_db(db: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.db() == db)
    }
}

impl TryFrom<u8> for LnaGain {
    type Error = Error;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_db(value).ok_or(Error::UnknownCode {
            kind: "LNA gain",
            code: value as u32,
        })
    }
}

impl From<LnaGain> for u8 {
    fn from(value: LnaGain) -> Self {
        value.db()
    }
}

impl std::fmt::Display for LnaGain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} dB", self.db())
    }
}

/// Lifecycle of a device session.
///
/// The only path is `Stopped -> Starting -> Running -> Stopping -> Stopped`;
/// a failed start drops straight back to `Stopped`.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => f.write_str("stopped"),
            Self::Starting => f.write_str("starting"),
            Self::Running => f.write_str("running"),
            Self::Stopping => f.write_str("stopping"),
        }
    }
}
