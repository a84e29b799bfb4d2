mod apply;
mod config;
mod info;
mod rffe;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, eyre};
use tracing_subscriber::EnvFilter;
use waverave_bladerf::BladeRf;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Open one specific bladeRF, chosen by serial number
    #[arg(short = 'd', long)]
    serial: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Info(info::Cmd),
    Apply(apply::Cmd),
    Save(config::SaveCmd),
    Rffe(rffe::Cmd),
}

fn open_device(serial: Option<&str>) -> color_eyre::Result<BladeRf> {
    let Some(serial) = serial else {
        return waverave_bladerf::open_bladerf().wrap_err("Failed to open bladeRF");
    };
    let devices =
        waverave_bladerf::list_bladerf_devices().wrap_err("Couldn't list bladeRF devices")?;
    let chosen = devices
        .into_iter()
        .find(|dev| dev.serial() == Some(serial))
        .ok_or_else(|| eyre!("Couldn't locate bladeRF serial {}", serial))?;
    chosen.open().wrap_err("Couldn't open selected bladeRF")
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Cli::parse();

    match args.command {
        Commands::Info(c) => c.cmd(args.serial),
        Commands::Save(c) => c.cmd(),
        Commands::Apply(c) => c.cmd(&open_device(args.serial.as_deref())?),
        Commands::Rffe(c) => c.cmd(&open_device(args.serial.as_deref())?),
    }
}
