use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_FREQ_HZ;
use crate::{Channel, LnaGain, SampleRate};

/// Persisted tuner settings.
///
/// This is a plain value: whoever persists it owns the file format, and
/// [`BladeRf::apply`][crate::BladeRf::apply] /
/// [`BladeRf::save`][crate::BladeRf::save] only consume and produce it.
///
/// The sample rate is kept as raw Hz so settings written by older versions
/// still load. Anything off the [`SampleRate`] ladder is replaced with
/// [`SampleRate::DEFAULT`] when applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfiguration {
    /// Center frequency in Hz, before correction.
    pub frequency: u64,
    /// Sample rate in Hz.
    #[serde(rename = "sample_rate")]
    pub sample_rate_hz: u32,
    /// Receive channel.
    pub channel: Channel,
    /// LNA gain.
    pub lna_gain: LnaGain,
    /// Reference clock error, in parts per million.
    pub frequency_correction: f64,
    /// Whether the sample pipeline may adjust `frequency_correction` on its
    /// own.
    pub auto_ppm: bool,
}

impl Default for TunerConfiguration {
    fn default() -> Self {
        Self {
            frequency: DEFAULT_FREQ_HZ,
            sample_rate_hz: SampleRate::DEFAULT.hz(),
            channel: Channel::Rx0,
            lna_gain: LnaGain::G16,
            frequency_correction: 0.0,
            auto_ppm: true,
        }
    }
}

impl TunerConfiguration {
    /// The ladder rate this configuration will actually run at.
    pub fn sample_rate(&self) -> SampleRate {
        SampleRate::from_hz(self.sample_rate_hz).unwrap_or(SampleRate::DEFAULT)
    }

    /// Whether the stored sample rate is off the ladder.
    pub fn has_legacy_sample_rate(&self) -> bool {
        SampleRate::from_hz(self.sample_rate_hz).is_none()
    }
}

/// Frequency to program so the tuner lands on `freq_hz` despite a reference
/// error of `ppm`.
pub fn corrected_frequency(freq_hz: u64, ppm: f64) -> u64 {
    if ppm == 0.0 {
        return freq_hz;
    }
    (freq_hz as f64 * (1e6 - ppm) / 1e6).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = TunerConfiguration::default();
        assert_eq!(c.frequency, 101_100_000);
        assert_eq!(c.sample_rate(), SampleRate::R5_0);
        assert_eq!(c.lna_gain, LnaGain::G16);
        assert!(c.auto_ppm);
    }

    #[test]
    fn json_shape() {
        let c = TunerConfiguration {
            channel: Channel::Rx1,
            lna_gain: LnaGain::G40,
            ..Default::default()
        };
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"sample_rate\":5000000"));
        assert!(json.contains("\"channel\":\"rx1\""));
        assert!(json.contains("\"lna_gain\":40"));
        let back: TunerConfiguration = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn legacy_rate_survives_loading() {
        let c: TunerConfiguration =
            serde_json::from_str(r#"{"frequency":162550000,"sample_rate":2400000}"#).unwrap();
        assert_eq!(c.sample_rate_hz, 2_400_000);
        assert!(c.has_legacy_sample_rate());
        assert_eq!(c.sample_rate(), SampleRate::DEFAULT);
        assert_eq!(c.channel, Channel::Rx0);
    }

    #[test]
    fn unknown_gain_is_rejected() {
        let r: Result<TunerConfiguration, _> = serde_json::from_str(r#"{"lna_gain":13}"#);
        assert!(r.is_err());
    }

    #[test]
    fn correction() {
        assert_eq!(corrected_frequency(100_000_000, 0.0), 100_000_000);
        assert_eq!(corrected_frequency(100_000_000, 10.0), 99_999_000);
        assert_eq!(corrected_frequency(100_000_000, -2.5), 100_000_250);
    }
}
