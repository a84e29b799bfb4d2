/*!
Peripheral register access for the bladeRF.

The FPGA's NIOS soft-core exposes its peripheral registers through 16-byte
[packets][crate::nios] exchanged over a dedicated pair of bulk endpoints. That
path has its own lock, separate from the control-transfer lock, so register
access never waits on a slow vendor request and vice versa.

```no_run
# fn main() -> anyhow::Result<()> {
let rf = waverave_bladerf::open_bladerf()?;
let periph = rf.peripheral();

// Turn the RF front-end on in receive mode and read back the register
periph.rfic_host_initialize()?;
let csr = periph.rffe_read()?;
println!("RFFE CSR: 0x{csr:08x}");
# Ok(())
# }
```
*/

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::nios::{NIOS_PKT_LEN, NiosPacket, NiosTarget};
use crate::transport::UsbTransport;
use crate::{BladeRf, Error};

/// Bit positions within the RF front-end control & status register.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RffeBit {
    ResetN,
    Enable,
    TxNRx,
    EnAgc,
    SyncIn,
    RxBiasEn,
    RxSpdt1,
    RxSpdt2,
    TxBiasEn,
    TxSpdt1,
    TxSpdt2,
    MimoRxEn0,
    MimoTxEn0,
    MimoRxEn1,
    MimoTxEn1,
    AdMuxout,
    CtrlOut,
}

impl RffeBit {
    /// Bit offset in the register. SPDT fields are two bits wide and
    /// `CtrlOut` is eight.
    pub fn shift(self) -> u32 {
        match self {
            Self::ResetN => 0,
            Self::Enable => 1,
            Self::TxNRx => 2,
            Self::EnAgc => 3,
            Self::SyncIn => 4,
            Self::RxBiasEn => 5,
            Self::RxSpdt1 => 6,
            Self::RxSpdt2 => 8,
            Self::TxBiasEn => 10,
            Self::TxSpdt1 => 11,
            Self::TxSpdt2 => 13,
            Self::MimoRxEn0 => 15,
            Self::MimoTxEn0 => 16,
            Self::MimoRxEn1 => 17,
            Self::MimoTxEn1 => 18,
            Self::AdMuxout => 19,
            Self::CtrlOut => 24,
        }
    }

    /// Single-bit mask at this position.
    pub fn mask(self) -> u32 {
        1 << self.shift()
    }
}

/// SPDT switch positions, for the two-bit SPDT fields of the RFFE register.
pub const SPDT_MASK: u32 = 0x3;
/// Switch disconnected.
pub const SPDT_SHUTDOWN: u32 = 0x0;
/// RF1 to RF2.
pub const SPDT_HIGHBAND: u32 = 0x1;
/// RF1 to RF3.
pub const SPDT_LOWBAND: u32 = 0x2;

pub(crate) struct PeripheralLink<T> {
    link: Mutex<T>,
}

impl<T: UsbTransport> PeripheralLink<T> {
    pub(crate) fn new(transport: T) -> Self {
        Self {
            link: Mutex::new(transport),
        }
    }

    fn link(&self) -> MutexGuard<'_, T> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn access(&self, request: NiosPacket) -> Result<NiosPacket, Error> {
        let raw = self.link().peripheral_exchange(&request.pack())?;
        let raw: [u8; NIOS_PKT_LEN] = raw.as_slice().try_into().map_err(|_| Error::ReturnData)?;
        let resp = NiosPacket::unpack(&raw)?;
        if resp.target != request.target || resp.addr != request.addr {
            return Err(Error::ReturnData);
        }
        if !resp.success {
            return Err(Error::NiosAccess {
                target: request.target,
                addr: request.addr,
            });
        }
        Ok(resp)
    }
}

/// Peripheral register operations for the bladeRF.
///
/// Borrows the device while doing operations. Get one with
/// [`BladeRf::peripheral`].
pub struct Peripheral<'a, T: UsbTransport> {
    inner: &'a BladeRf<T>,
}

impl<'a, T: UsbTransport> Peripheral<'a, T> {
    pub(crate) fn new(inner: &'a BladeRf<T>) -> Peripheral<'a, T> {
        Self { inner }
    }

    /// Read a 32-bit register from a peripheral target.
    pub fn nios_read(&self, target: NiosTarget, addr: u8) -> Result<u32, Error> {
        let resp = self
            .inner
            .peripheral
            .access(NiosPacket::read(target, addr))?;
        Ok(resp.data)
    }

    /// Write a 32-bit register on a peripheral target.
    pub fn nios_write(&self, target: NiosTarget, addr: u8, data: u32) -> Result<(), Error> {
        self.inner
            .peripheral
            .access(NiosPacket::write(target, addr, data))?;
        Ok(())
    }

    /// Read the RF front-end control & status register.
    pub fn rffe_read(&self) -> Result<u32, Error> {
        let reg = self.nios_read(NiosTarget::RffeCsr, 0)?;
        tracing::info!("RFFE read: 0x{reg:x}");
        Ok(reg)
    }

    /// Write the RF front-end control & status register.
    pub fn rffe_write(&self, reg: u32) -> Result<(), Error> {
        self.nios_write(NiosTarget::RffeCsr, 0, reg)
    }

    /// Bring the RF front-end up under host control.
    ///
    /// Sets the enable and TX/RX-select bits of the RFFE register, clearing
    /// everything else.
    pub fn rfic_host_initialize(&self) -> Result<(), Error> {
        tracing::info!("Initializing bladeRF RF front-end in host mode");
        self.rffe_write(RffeBit::Enable.mask() | RffeBit::TxNRx.mask())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockTransport;
    use nusb::transfer::TransferError;

    #[test]
    fn rffe_register_round_trip() {
        let mock = MockTransport::new();
        let rf = BladeRf::new(mock.clone());
        let periph = rf.peripheral();
        periph.rffe_write(0x0000_0146).unwrap();
        assert_eq!(mock.register(0x03, 0), Some(0x146));
        assert_eq!(periph.rffe_read().unwrap(), 0x146);
        // The peripheral path never touches the control endpoint
        assert_eq!(mock.transfer_count(), 0);
    }

    #[test]
    fn nios_read_returns_register_value() {
        let mock = MockTransport::new();
        let rf = BladeRf::new(mock.clone());
        mock.set_register(NiosTarget::Adf4351.id(), 0x05, 0x0058_0005);
        let periph = rf.peripheral();
        assert_eq!(periph.nios_read(NiosTarget::Adf4351, 0x05).unwrap(), 0x0058_0005);
        assert_eq!(periph.nios_read(NiosTarget::Adf4351, 0x04).unwrap(), 0);
        let pkt = NiosPacket::unpack(&mock.packets()[0]).unwrap();
        assert!(!pkt.write);
        assert_eq!(pkt.addr, 0x05);
    }

    #[test]
    fn unanswered_exchange_releases_link() {
        let mock = MockTransport::new();
        let rf = BladeRf::new(mock.clone());
        mock.peripheral_fail(TransferError::Cancelled);
        let periph = rf.peripheral();
        assert!(matches!(
            periph.rffe_read(),
            Err(Error::Transfer(TransferError::Cancelled))
        ));
        periph.rffe_write(0x6).unwrap();
        assert_eq!(periph.rffe_read().unwrap(), 0x6);
    }

    #[test]
    fn host_initialize_sets_enable_and_txnrx() {
        let mock = MockTransport::new();
        let rf = BladeRf::new(mock.clone());
        rf.peripheral().rfic_host_initialize().unwrap();
        let packets = mock.packets();
        assert_eq!(packets.len(), 1);
        let pkt = NiosPacket::unpack(&packets[0]).unwrap();
        assert_eq!(pkt.target, NiosTarget::RffeCsr);
        assert!(pkt.write);
        assert_eq!(pkt.data, 0b110);
    }

    #[test]
    fn unknown_target_in_response() {
        let mock = MockTransport::new();
        let rf = BladeRf::new(mock.clone());
        let mut raw = NiosPacket::read(NiosTarget::RffeCsr, 0).pack();
        raw[1] = 0x77;
        mock.peripheral_reply(raw.to_vec());
        assert!(matches!(
            rf.peripheral().rffe_read(),
            Err(Error::NiosTarget(0x77))
        ));
    }

    #[test]
    fn missing_success_flag() {
        let mock = MockTransport::new();
        let rf = BladeRf::new(mock.clone());
        mock.peripheral_reply(NiosPacket::write(NiosTarget::Control, 4, 1).pack().to_vec());
        assert!(matches!(
            rf.peripheral().nios_write(NiosTarget::Control, 4, 1),
            Err(Error::NiosAccess { addr: 4, .. })
        ));
    }

    #[test]
    fn short_response() {
        let mock = MockTransport::new();
        let rf = BladeRf::new(mock.clone());
        mock.peripheral_reply(vec![b'C', 0x03]);
        assert!(matches!(rf.peripheral().rffe_read(), Err(Error::ReturnData)));
    }

    #[test]
    fn spdt_fields() {
        let reg = SPDT_LOWBAND << RffeBit::RxSpdt1.shift();
        assert_eq!((reg >> RffeBit::RxSpdt1.shift()) & SPDT_MASK, SPDT_LOWBAND);
        assert_eq!(RffeBit::CtrlOut.mask(), 1 << 24);
        assert_ne!(SPDT_HIGHBAND, SPDT_SHUTDOWN);
    }
}
