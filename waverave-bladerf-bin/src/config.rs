use std::path::{Path, PathBuf};

use clap::Args;
use color_eyre::eyre::{Context, eyre};
use waverave_bladerf::{Channel, LnaGain, SampleRate, TunerConfiguration};

/// Tuner settings that can override a configuration file.
#[derive(Args, Debug, Default)]
pub struct TunerParams {
    /// Center frequency in Hz. Valid range is 47 MHz to 6000 MHz.
    #[arg(short, long = "freq")]
    freq_hz: Option<u64>,

    /// Sample rate in Hz. One of 1.75, 2.5, 3.5, 5, 5.5, 6, 7, 8, 9, 10, 12,
    /// 14, 15, or 20 MHz; anything else falls back to 5 MHz.
    #[arg(short = 'r', long = "rate")]
    sample_rate_hz: Option<u32>,

    /// Receive channel, 0 or 1.
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(0..=1))]
    channel: Option<u16>,

    /// RX LNA gain in dB: 0, 8, 16, 24, 32, 40, 50, 60, 70, or 75.
    #[arg(short = 'l', long = "lna")]
    lna_gain: Option<u8>,

    /// Reference clock error in ppm.
    #[arg(short = 'C', long)]
    ppm: Option<f64>,

    /// Let the sample pipeline adjust the ppm correction on its own.
    #[arg(long = "auto_ppm")]
    auto_ppm: Option<bool>,
}

impl TunerParams {
    /// Apply every set parameter on top of `config`.
    pub fn overlay(&self, config: &mut TunerConfiguration) -> color_eyre::Result<()> {
        if let Some(freq_hz) = self.freq_hz {
            config.frequency = freq_hz;
        }
        if let Some(rate) = self.sample_rate_hz {
            config.sample_rate_hz = rate;
        }
        if let Some(channel) = self.channel {
            config.channel = Channel::from_code(channel)
                .ok_or_else(|| eyre!("channel valid range is 0-1, but got {channel}"))?;
        }
        if let Some(gain) = self.lna_gain {
            config.lna_gain = LnaGain::try_from(gain).wrap_err("Invalid LNA gain")?;
        }
        if let Some(ppm) = self.ppm {
            config.frequency_correction = ppm;
        }
        if let Some(auto_ppm) = self.auto_ppm {
            config.auto_ppm = auto_ppm;
        }
        Ok(())
    }
}

/// Read a tuner configuration from a JSON file. Missing fields take their
/// defaults.
pub fn load(path: &Path) -> color_eyre::Result<TunerConfiguration> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Couldn't read configuration {}", path.display()))?;
    let config = serde_json::from_str(&raw)
        .wrap_err_with(|| format!("Couldn't parse configuration {}", path.display()))?;
    Ok(config)
}

/// Write a tuner configuration to a JSON file.
pub fn store(path: &Path, config: &TunerConfiguration) -> color_eyre::Result<()> {
    let raw = serde_json::to_string_pretty(config)?;
    std::fs::write(path, raw)
        .wrap_err_with(|| format!("Couldn't write configuration {}", path.display()))?;
    tracing::info!("Saved tuner configuration to {}", path.display());
    Ok(())
}

/// Write a tuner configuration file without touching any device.
///
/// Starts from the existing file if there is one, then the command-line
/// overrides. Legacy sample rates are rewritten to the default rate.
#[derive(Args, Debug)]
pub struct SaveCmd {
    /// Configuration file to create or update
    path: PathBuf,

    #[command(flatten)]
    params: TunerParams,
}

impl SaveCmd {
    pub fn cmd(&self) -> color_eyre::Result<()> {
        let mut config = if self.path.exists() {
            load(&self.path)?
        } else {
            TunerConfiguration::default()
        };
        self.params.overlay(&mut config)?;
        if config.has_legacy_sample_rate() {
            config.sample_rate_hz = SampleRate::coerce(config.sample_rate_hz).hz();
        }
        store(&self.path, &config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tuner.json");
        let config = TunerConfiguration {
            frequency: 162_550_000,
            lna_gain: LnaGain::G50,
            frequency_correction: -1.25,
            ..Default::default()
        };
        store(&path, &config).unwrap();
        assert_eq!(load(&path).unwrap(), config);
    }

    #[test]
    fn load_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tuner.json");
        std::fs::write(&path, r#"{ "channel": "rx1" }"#).unwrap();
        let config = load(&path).unwrap();
        assert_eq!(config.channel, Channel::Rx1);
        assert_eq!(config.frequency, waverave_bladerf::DEFAULT_FREQ_HZ);
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn overlay_overrides_only_set_fields() {
        let params = TunerParams {
            freq_hz: Some(433_920_000),
            channel: Some(1),
            ..Default::default()
        };
        let mut config = TunerConfiguration::default();
        params.overlay(&mut config).unwrap();
        assert_eq!(config.frequency, 433_920_000);
        assert_eq!(config.channel, Channel::Rx1);
        assert_eq!(config.lna_gain, LnaGain::G16);
    }

    #[test]
    fn overlay_rejects_unknown_gain() {
        let params = TunerParams {
            lna_gain: Some(12),
            ..Default::default()
        };
        assert!(params.overlay(&mut TunerConfiguration::default()).is_err());
    }

    #[test]
    fn save_migrates_legacy_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tuner.json");
        std::fs::write(&path, r#"{ "sample_rate": 2400000, "frequency": 98000000 }"#).unwrap();
        let cmd = SaveCmd {
            path: path.clone(),
            params: TunerParams::default(),
        };
        cmd.cmd().unwrap();
        let config = load(&path).unwrap();
        assert_eq!(config.sample_rate_hz, 5_000_000);
        assert_eq!(config.frequency, 98_000_000);
    }
}
