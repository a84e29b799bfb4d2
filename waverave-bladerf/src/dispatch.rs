use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::consts::CONTROL_TIMEOUT;
use crate::transport::UsbTransport;
use crate::{ControlRequest, Error};

/// Issues vendor control transfers for logical [`ControlRequest`]s.
///
/// The transport sits behind a mutex, so at most one control transfer is in
/// flight no matter how many threads share the dispatcher. Every transfer
/// blocks for up to [`CONTROL_TIMEOUT`] and is never retried.
pub struct Dispatcher<T> {
    link: Mutex<T>,
}

impl<T: UsbTransport> Dispatcher<T> {
    /// Wrap a transport.
    pub fn new(transport: T) -> Self {
        Self {
            link: Mutex::new(transport),
        }
    }

    fn link(&self) -> MutexGuard<'_, T> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read up to `length` bytes from the device.
    pub fn read_bytes(
        &self,
        req: ControlRequest,
        value: u16,
        index: u16,
        length: usize,
    ) -> Result<Vec<u8>, Error> {
        if length > u16::MAX as usize {
            return Err(Error::InvalidParameter(
                "Control transfer length must fit in 16 bits",
            ));
        }
        let mut buf = vec![0u8; length];
        let n = self.link().control_in(
            req.opcode(),
            value,
            index,
            &mut buf,
            CONTROL_TIMEOUT,
        )?;
        tracing::debug!(request = %req, value, index, length, read = n, "control in");
        buf.truncate(n);
        Ok(buf)
    }

    /// Read a little-endian signed primitive of 1, 2, or 4 bytes.
    ///
    /// Any other length is rejected before the device is touched.
    pub fn read_primitive(
        &self,
        req: ControlRequest,
        value: u16,
        index: u16,
        length: usize,
    ) -> Result<i32, Error> {
        if !matches!(length, 1 | 2 | 4) {
            return Err(Error::InvalidParameter(
                "Primitive reads must be 1, 2, or 4 bytes long",
            ));
        }
        let data = self.read_bytes(req, value, index, length)?;
        if data.len() != length {
            return Err(Error::ShortTransfer {
                request: req,
                expected: length,
                actual: data.len(),
            });
        }
        Ok(match *data.as_slice() {
            [b] => b as i8 as i32,
            [b0, b1] => i16::from_le_bytes([b0, b1]) as i32,
            [b0, b1, b2, b3] => i32::from_le_bytes([b0, b1, b2, b3]),
            _ => return Err(Error::ReturnData),
        })
    }

    /// Write `data` to the device. An empty payload sends the command alone.
    pub fn write_bytes(
        &self,
        req: ControlRequest,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<(), Error> {
        self.link()
            .control_out(req.opcode(), value, index, data, CONTROL_TIMEOUT)?;
        tracing::debug!(request = %req, value, index, length = data.len(), "control out");
        Ok(())
    }

    /// Write a plain-old-data struct as the payload.
    pub fn write_struct<S: bytemuck::Pod>(
        &self,
        req: ControlRequest,
        value: u16,
        index: u16,
        data: &S,
    ) -> Result<(), Error> {
        self.write_bytes(req, value, index, bytemuck::bytes_of(data))
    }
}
