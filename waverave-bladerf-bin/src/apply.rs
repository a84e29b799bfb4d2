use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::Context;
use waverave_bladerf::{BladeRf, TunerConfiguration};

use crate::config::{self, TunerParams};

/// Start a receive session and apply a tuner configuration.
#[derive(Args, Debug)]
pub struct Cmd {
    /// JSON configuration file to start from
    #[arg(short = 'i', long = "config")]
    config: Option<PathBuf>,

    /// Write the resulting configuration here once applied
    #[arg(short = 's', long = "save")]
    save: Option<PathBuf>,

    /// Switch the transceiver back off once done
    #[arg(long)]
    stop: bool,

    #[command(flatten)]
    params: TunerParams,
}

impl Cmd {
    pub fn cmd(&self, rf: &BladeRf) -> color_eyre::Result<()> {
        let mut tuner = match self.config.as_ref() {
            Some(path) => config::load(path)?,
            None => TunerConfiguration::default(),
        };
        self.params.overlay(&mut tuner)?;

        rf.start().wrap_err("Failed starting bladeRF session")?;
        let res = rf
            .apply(&tuner)
            .wrap_err("Failed applying tuner configuration");
        println!("{}", rf.status());

        if res.is_ok() {
            if let Some(path) = self.save.as_ref() {
                config::store(path, &rf.save())?;
            }
        }
        if self.stop {
            rf.stop();
        }
        res
    }
}
