//! Decoding of identification blobs.
//!
//! The part-id / serial-number read returns a fixed 24-byte blob:
//!
//! ```text
//! offset  0: part id word 0   (LE u32)
//! offset  4: part id word 1   (LE u32)
//! offset  8: serial number    (16 bytes, layout depends on firmware)
//! ```
//!
//! Firmware in the field uses one of two serial layouts, see [`SerialLayout`].
//! [`serial_number`] always decodes with [`SERIAL_LAYOUT`].

use crate::{Error, consts::SERIAL_BLOB_LEN};

/// Layout of the 16-byte serial number region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerialLayout {
    /// Four little-endian 32-bit words, rendered as hex and dash-joined.
    HexWords,
    /// Eight UTF-16LE code units of text, NUL-padded.
    Utf16,
}

/// The serial layout used by the firmware this crate targets.
pub const SERIAL_LAYOUT: SerialLayout = SerialLayout::HexWords;

const SERIAL_OFFSET: usize = 8;
const SERIAL_LEN: usize = 16;

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Zeroable, bytemuck::Pod)]
struct SerialBlob {
    part_id: [u32; 2],
    serial_no: [u32; 4],
}

impl SerialBlob {
    fn parse(blob: &[u8]) -> Result<Self, Error> {
        let blob = blob.get(..SERIAL_BLOB_LEN).ok_or(Error::ReturnData)?;
        let mut v: SerialBlob = bytemuck::pod_read_unaligned(blob);
        for x in v.part_id.iter_mut() {
            *x = u32::from_le(*x);
        }
        for x in v.serial_no.iter_mut() {
            *x = u32::from_le(*x);
        }
        Ok(v)
    }
}

fn hex_words(words: &[u32]) -> String {
    words
        .iter()
        .map(|w| format!("{w:08X}"))
        .collect::<Vec<_>>()
        .join("-")
}

/// Decode the part id, e.g. `"A000CB3C-00000000"`.
pub fn part_id(blob: &[u8]) -> Result<String, Error> {
    Ok(hex_words(&SerialBlob::parse(blob)?.part_id))
}

/// Decode the serial number with the firmware's [`SERIAL_LAYOUT`].
pub fn serial_number(blob: &[u8]) -> Result<String, Error> {
    serial_number_with(blob, SERIAL_LAYOUT)
}

/// Decode the serial number with an explicit layout.
pub fn serial_number_with(blob: &[u8], layout: SerialLayout) -> Result<String, Error> {
    match layout {
        SerialLayout::HexWords => Ok(hex_words(&SerialBlob::parse(blob)?.serial_no)),
        SerialLayout::Utf16 => {
            let raw = blob
                .get(SERIAL_OFFSET..SERIAL_OFFSET + SERIAL_LEN)
                .ok_or(Error::ReturnData)?;
            let units: Vec<u16> = raw
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .take_while(|&u| u != 0)
                .collect();
            let text = String::from_utf16(&units).map_err(|_| Error::ReturnData)?;
            Ok(text.trim().to_owned())
        }
    }
}

/// Decode a firmware version string, dropping NUL padding and whitespace.
pub fn firmware_version(blob: &[u8]) -> Result<String, Error> {
    let end = blob.iter().position(|&b| b == 0).unwrap_or(blob.len());
    let text = std::str::from_utf8(&blob[..end]).map_err(|_| Error::ReturnData)?;
    Ok(text.trim().to_owned())
}

/// Identification read from the device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Serial {
    /// Part id words, hex and dash-joined.
    pub part_id: String,
    /// Serial number, decoded per [`SERIAL_LAYOUT`].
    pub serial_number: String,
}

impl Serial {
    /// Decode both fields from one identification blob.
    pub fn parse(blob: &[u8]) -> Result<Self, Error> {
        Ok(Self {
            part_id: part_id(blob)?,
            serial_number: serial_number(blob)?,
        })
    }
}

impl std::fmt::Display for Serial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (part {})", self.serial_number, self.part_id)
    }
}
