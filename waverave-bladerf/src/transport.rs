//! The USB link underneath the driver.
//!
//! [`UsbTransport`] is the seam between the protocol code and the actual USB
//! stack. [`NusbTransport`] implements it over an `nusb` interface; tests use
//! a scripted implementation instead.

use std::future::Future;
use std::time::Duration;

use async_io::Timer;
use futures_lite::future::{self, block_on};
use nusb::transfer::{Control, ControlType, Recipient, RequestBuffer, TransferError};

use crate::consts::{PERIPHERAL_EP_IN, PERIPHERAL_EP_OUT, PERIPHERAL_TIMEOUT};
use crate::nios::NIOS_PKT_LEN;

/// Raw vendor control transfers and peripheral packet exchange.
///
/// Implementations are cloned so the control path and the peripheral path can
/// be locked independently. Clones must share the same device.
pub trait UsbTransport: Clone + Send {
    /// Device-to-host vendor control transfer. Returns the number of bytes
    /// written into `buf`.
    fn control_in(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransferError>;

    /// Host-to-device vendor control transfer. `data` may be empty.
    fn control_out(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, TransferError>;

    /// Send one peripheral packet and read back the response.
    fn peripheral_exchange(&mut self, packet: &[u8; NIOS_PKT_LEN])
    -> Result<Vec<u8>, TransferError>;
}

/// [`UsbTransport`] over a claimed `nusb` interface.
#[derive(Clone)]
pub struct NusbTransport {
    interface: nusb::Interface,
}

impl NusbTransport {
    pub(crate) fn new(interface: nusb::Interface) -> Self {
        Self { interface }
    }

    fn control(request: u8, value: u16, index: u16) -> Control {
        Control {
            control_type: ControlType::Vendor,
            recipient: Recipient::Device,
            request,
            value,
            index,
        }
    }
}

impl UsbTransport for NusbTransport {
    fn control_in(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransferError> {
        self.interface
            .control_in_blocking(Self::control(request, value, index), buf, timeout)
    }

    fn control_out(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, TransferError> {
        self.interface
            .control_out_blocking(Self::control(request, value, index), data, timeout)
    }

    fn peripheral_exchange(
        &mut self,
        packet: &[u8; NIOS_PKT_LEN],
    ) -> Result<Vec<u8>, TransferError> {
        let out = self.interface.bulk_out(PERIPHERAL_EP_OUT, packet.to_vec());
        block_on_timeout(async { out.await.into_result() }, PERIPHERAL_TIMEOUT)?;
        let resp = self
            .interface
            .bulk_in(PERIPHERAL_EP_IN, RequestBuffer::new(NIOS_PKT_LEN));
        block_on_timeout(async { resp.await.into_result() }, PERIPHERAL_TIMEOUT)
    }
}

/// Run a transfer future on the calling thread, giving up after `timeout`.
///
/// Dropping an unfinished `nusb` transfer cancels it, so a timeout is reported
/// as [`TransferError::Cancelled`].
fn block_on_timeout<T>(
    fut: impl Future<Output = Result<T, TransferError>>,
    timeout: Duration,
) -> Result<T, TransferError> {
    block_on(future::or(fut, async {
        Timer::after(timeout).await;
        Err(TransferError::Cancelled)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn silent_endpoint_times_out() {
        let start = Instant::now();
        let res: Result<Vec<u8>, _> =
            block_on_timeout(future::pending(), Duration::from_millis(20));
        assert!(matches!(res, Err(TransferError::Cancelled)));
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn finished_transfer_wins() {
        let res = block_on_timeout(future::ready(Ok(vec![1u8, 2])), PERIPHERAL_TIMEOUT);
        assert_eq!(res.unwrap(), vec![1, 2]);
        let res: Result<(), _> =
            block_on_timeout(future::ready(Err(TransferError::Stall)), PERIPHERAL_TIMEOUT);
        assert!(matches!(res, Err(TransferError::Stall)));
    }
}
