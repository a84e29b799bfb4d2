//! The NIOS 8x32 peripheral packet.
//!
//! The FPGA's soft-core processor exposes its peripheral registers through a
//! fixed 16-byte packet with an 8-bit address and a 32-bit data word:
//!
//! ```text
//! +------+--------+-------+------+------+---------------+--------------+
//! |  0   |   1    |   2   |  3   |  4   |     5..9      |    9..16     |
//! | 'C'  | target | flags | resv | addr | data (LE u32) |   reserved   |
//! +------+--------+-------+------+------+---------------+--------------+
//! ```
//!
//! Flag bit 0 marks a write, bit 1 is set by the device on success.

use crate::Error;

/// Length of every peripheral packet.
pub const NIOS_PKT_LEN: usize = 16;

const MAGIC: u8 = b'C';

const IDX_MAGIC: usize = 0;
const IDX_TARGET_ID: usize = 1;
const IDX_FLAGS: usize = 2;
const IDX_ADDR: usize = 4;
const IDX_DATA: usize = 5;

const FLAG_WRITE: u8 = 1 << 0;
const FLAG_SUCCESS: u8 = 1 << 1;

/// Peripheral targets reachable through the packet interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NiosTarget {
    /// FPGA version (read only).
    Version,
    /// FPGA control/config register.
    Control,
    /// XB-200 ADF4351 register access (write only).
    Adf4351,
    /// RF front-end control & status GPIO.
    RffeCsr,
    /// ADF400x configuration.
    Adf400x,
    /// Saved fast-lock profile.
    Fastlock,
}

impl NiosTarget {
    /// Raw target id byte.
    pub fn id(self) -> u8 {
        match self {
            Self::Version => 0x00,
            Self::Control => 0x01,
            Self::Adf4351 => 0x02,
            Self::RffeCsr => 0x03,
            Self::Adf400x => 0x04,
            Self::Fastlock => 0x05,
        }
    }

    /// Look up a target by its raw id byte.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0x00 => Some(Self::Version),
            0x01 => Some(Self::Control),
            0x02 => Some(Self::Adf4351),
            0x03 => Some(Self::RffeCsr),
            0x04 => Some(Self::Adf400x),
            0x05 => Some(Self::Fastlock),
            _ => None,
        }
    }
}

/// A decoded peripheral packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NiosPacket {
    /// Peripheral being addressed.
    pub target: NiosTarget,
    /// Whether this is a register write.
    pub write: bool,
    /// Set by the device when the access succeeded.
    pub success: bool,
    /// Register address.
    pub addr: u8,
    /// Register data.
    pub data: u32,
}

impl NiosPacket {
    /// Build a register read request.
    pub fn read(target: NiosTarget, addr: u8) -> Self {
        Self {
            target,
            write: false,
            success: false,
            addr,
            data: 0,
        }
    }

    /// Build a register write request.
    pub fn write(target: NiosTarget, addr: u8, data: u32) -> Self {
        Self {
            target,
            write: true,
            success: false,
            addr,
            data,
        }
    }

    /// Encode into the 16-byte wire format.
    pub fn pack(&self) -> [u8; NIOS_PKT_LEN] {
        let mut buf = [0u8; NIOS_PKT_LEN];
        buf[IDX_MAGIC] = MAGIC;
        buf[IDX_TARGET_ID] = self.target.id();
        let mut flags = 0;
        if self.write {
            flags |= FLAG_WRITE;
        }
        if self.success {
            flags |= FLAG_SUCCESS;
        }
        buf[IDX_FLAGS] = flags;
        buf[IDX_ADDR] = self.addr;
        buf[IDX_DATA..IDX_DATA + 4].copy_from_slice(&self.data.to_le_bytes());
        buf
    }

    /// Decode from the 16-byte wire format.
    ///
    /// Fails if the magic byte is wrong or the target id is unknown. Reserved
    /// bytes are ignored.
    pub fn unpack(buf: &[u8; NIOS_PKT_LEN]) -> Result<Self, Error> {
        if buf[IDX_MAGIC] != MAGIC {
            return Err(Error::NiosMagic(buf[IDX_MAGIC]));
        }
        let target =
            NiosTarget::from_id(buf[IDX_TARGET_ID]).ok_or(Error::NiosTarget(buf[IDX_TARGET_ID]))?;
        let flags = buf[IDX_FLAGS];
        let mut data = [0u8; 4];
        data.copy_from_slice(&buf[IDX_DATA..IDX_DATA + 4]);
        Ok(Self {
            target,
            write: flags & FLAG_WRITE != 0,
            success: flags & FLAG_SUCCESS != 0,
            addr: buf[IDX_ADDR],
            data: u32::from_le_bytes(data),
        })
    }
}

/// Pack a request from loose fields.
///
/// Only the low byte of `addr` and the low 32 bits of `data` are kept.
pub fn pack(target: NiosTarget, write: bool, addr: u32, data: u64) -> [u8; NIOS_PKT_LEN] {
    NiosPacket {
        target,
        write,
        success: false,
        addr: (addr & 0xFF) as u8,
        data: (data & 0xFFFF_FFFF) as u32,
    }
    .pack()
}

/// Unpack a packet into `(target, write, addr, data)`.
pub fn unpack(buf: &[u8; NIOS_PKT_LEN]) -> Result<(NiosTarget, bool, u8, u32), Error> {
    let pkt = NiosPacket::unpack(buf)?;
    Ok((pkt.target, pkt.write, pkt.addr, pkt.data))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGETS: [NiosTarget; 6] = [
        NiosTarget::Version,
        NiosTarget::Control,
        NiosTarget::Adf4351,
        NiosTarget::RffeCsr,
        NiosTarget::Adf400x,
        NiosTarget::Fastlock,
    ];

    #[test]
    fn layout() {
        let buf = pack(NiosTarget::RffeCsr, true, 0x1_23, 0xAABB_CCDD);
        assert_eq!(buf.len(), NIOS_PKT_LEN);
        assert_eq!(
            buf,
            [
                b'C', 0x03, 0x01, 0x00, 0x23, 0xDD, 0xCC, 0xBB, 0xAA, 0, 0, 0, 0, 0, 0, 0
            ]
        );
        let read = NiosPacket::read(NiosTarget::Version, 0).pack();
        assert_eq!(read[0], b'C');
        assert_eq!(read[2], 0);
    }

    #[test]
    fn round_trip_masks_address_and_data() {
        let addrs = [0u32, 1, 0x7F, 0xFF, 0x100, 0xDEAD_BEEF];
        let datas = [0u64, 1, 0xFFFF_FFFF, 0x1_0000_0000, u64::MAX];
        for target in TARGETS {
            for write in [false, true] {
                for addr in addrs {
                    for data in datas {
                        let got = unpack(&pack(target, write, addr, data)).unwrap();
                        assert_eq!(
                            got,
                            (target, write, (addr & 0xFF) as u8, (data & 0xFFFF_FFFF) as u32)
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn success_flag() {
        let mut buf = NiosPacket::write(NiosTarget::RffeCsr, 0, 6).pack();
        buf[2] |= 0x02;
        let pkt = NiosPacket::unpack(&buf).unwrap();
        assert!(pkt.write);
        assert!(pkt.success);
        assert_eq!(pkt.data, 6);
    }

    #[test]
    fn unknown_target_is_rejected() {
        let mut buf = NiosPacket::read(NiosTarget::Control, 0).pack();
        buf[1] = 0x42;
        assert!(matches!(NiosPacket::unpack(&buf), Err(Error::NiosTarget(0x42))));
        buf[1] = 0x80;
        assert!(matches!(NiosPacket::unpack(&buf), Err(Error::NiosTarget(0x80))));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut buf = NiosPacket::read(NiosTarget::Control, 0).pack();
        buf[0] = 0;
        assert!(matches!(NiosPacket::unpack(&buf), Err(Error::NiosMagic(0))));
    }
}
