use clap::Args;
use color_eyre::eyre::Context;
use waverave_bladerf::list_bladerf_devices;

/// Retrieve as much info as possible from each attached bladeRF.
#[derive(Args, Debug)]
pub struct Cmd {}

impl Cmd {
    pub fn cmd(&self, filter_serial: Option<String>) -> color_eyre::Result<()> {
        println!("Binary release {}", env!("CARGO_PKG_VERSION"));

        let mut found = false;
        for dev in list_bladerf_devices().wrap_err("Couldn't enumerate bladeRF devices")? {
            let serial = dev
                .serial()
                .map(|s| s.to_owned())
                .unwrap_or_else(|| String::from("Unknown"));

            if let Some(s) = filter_serial.as_ref() {
                if s != &serial {
                    continue;
                }
            }
            found = true;

            let rf = match dev.open() {
                Ok(rf) => rf,
                Err(e) => {
                    println!("Couldn't open bladeRF, serial {serial}: {e}");
                    continue;
                }
            };

            println!();
            println!("Found bladeRF, USB serial {serial}");

            let info = rf.info();
            match info.serial() {
                Ok(serial) => {
                    println!("Serial number: {}", serial.serial_number);
                    println!("Part ID Number: {}", serial.part_id);
                }
                Err(e) => println!("Serial number: ❌ Failed to retrieve ({e})"),
            }
            match info.board_id() {
                Ok(id) => println!("Board ID: 0x{id:02x}"),
                Err(e) => println!("Board ID: ❌ Failed to retrieve ({e})"),
            }
            let version = info
                .firmware_version()
                .unwrap_or_else(|_| String::from("❌ Failed to retrieve"));
            println!(
                "Firmware Version: {} (opcode revision {})",
                version,
                info.opcode_revision()
            );
        }

        if !found {
            if let Some(serial) = filter_serial {
                println!("Unable to locate bladeRF with serial number {serial}");
            } else {
                println!("Couldn't find any bladeRF devices");
            }
        }
        Ok(())
    }
}
