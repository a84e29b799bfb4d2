use clap::{Args, Subcommand};
use color_eyre::eyre::Context;
use waverave_bladerf::BladeRf;

/// Read or write the RF front-end control register.
#[derive(Args, Debug)]
pub struct Cmd {
    #[command(subcommand)]
    op: Op,
}

#[derive(Subcommand, Debug)]
enum Op {
    /// Print the register value
    Read,
    /// Write a raw register value, e.g. 0x6
    Write {
        #[arg(value_parser = parse_reg)]
        value: u32,
    },
    /// Enable the front end under host control
    Init,
}

fn parse_reg(s: &str) -> Result<u32, std::num::ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

impl Cmd {
    pub fn cmd(&self, rf: &BladeRf) -> color_eyre::Result<()> {
        let periph = rf.peripheral();
        match self.op {
            Op::Read => {
                let reg = periph.rffe_read().wrap_err("Failed reading RFFE register")?;
                println!("RFFE: 0x{reg:08x}");
            }
            Op::Write { value } => periph
                .rffe_write(value)
                .wrap_err("Failed writing RFFE register")?,
            Op::Init => periph
                .rfic_host_initialize()
                .wrap_err("Failed initializing RF front end")?,
        }
        Ok(())
    }
}
