//! A scripted [`UsbTransport`] for exercising the driver without hardware.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nusb::transfer::TransferError;

use crate::ControlRequest;
use crate::nios::{NIOS_PKT_LEN, NiosPacket};
use crate::transport::UsbTransport;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

#[derive(Clone, Debug)]
pub struct Transfer {
    pub direction: Direction,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub data: Vec<u8>,
}

#[derive(Default)]
struct Inner {
    transfers: Vec<Transfer>,
    replies: HashMap<u8, VecDeque<Vec<u8>>>,
    failures: HashMap<u8, TransferError>,
    registers: HashMap<(u8, u8), u32>,
    packets: Vec<[u8; NIOS_PKT_LEN]>,
    peripheral_reply: Option<Vec<u8>>,
    peripheral_failure: Option<TransferError>,
    in_flight: usize,
    max_in_flight: usize,
}

/// Records every transfer. Unscripted reads return zeros, except
/// `SET_LNA_GAIN`, which acknowledges with 1. Peripheral packets hit a small
/// register file.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    /// Queue a reply for the next read of `req`.
    pub fn reply(&self, req: ControlRequest, data: Vec<u8>) {
        self.inner()
            .replies
            .entry(req.opcode())
            .or_default()
            .push_back(data);
    }

    /// Make every transfer of `req` fail from now on.
    pub fn fail(&self, req: ControlRequest, err: TransferError) {
        self.inner().failures.insert(req.opcode(), err);
    }

    /// Replace the next peripheral response with raw bytes.
    pub fn peripheral_reply(&self, data: Vec<u8>) {
        self.inner().peripheral_reply = Some(data);
    }

    /// Make the next peripheral exchange fail, as a timed-out read would.
    pub fn peripheral_fail(&self, err: TransferError) {
        self.inner().peripheral_failure = Some(err);
    }

    pub fn set_register(&self, target: u8, addr: u8, value: u32) {
        self.inner().registers.insert((target, addr), value);
    }

    pub fn register(&self, target: u8, addr: u8) -> Option<u32> {
        self.inner().registers.get(&(target, addr)).copied()
    }

    pub fn transfers(&self) -> Vec<Transfer> {
        self.inner().transfers.clone()
    }

    pub fn transfers_of(&self, req: ControlRequest) -> Vec<Transfer> {
        self.transfers()
            .into_iter()
            .filter(|t| t.request == req.opcode())
            .collect()
    }

    pub fn transfer_count(&self) -> usize {
        self.inner().transfers.len()
    }

    pub fn packets(&self) -> Vec<[u8; NIOS_PKT_LEN]> {
        self.inner().packets.clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.inner().max_in_flight
    }

    fn begin(&self, transfer: Transfer) -> Result<(), TransferError> {
        let mut inner = self.inner();
        let request = transfer.request;
        inner.transfers.push(transfer);
        if let Some(err) = inner.failures.get(&request) {
            return Err(*err);
        }
        inner.in_flight += 1;
        inner.max_in_flight = inner.max_in_flight.max(inner.in_flight);
        Ok(())
    }

    fn end(&self) {
        // Give overlapping callers a chance to show up in `max_in_flight`.
        std::thread::yield_now();
        self.inner().in_flight -= 1;
    }
}

impl UsbTransport for MockTransport {
    fn control_in(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, TransferError> {
        self.begin(Transfer {
            direction: Direction::In,
            request,
            value,
            index,
            data: Vec::new(),
        })?;
        let reply = self
            .inner()
            .replies
            .get_mut(&request)
            .and_then(|q| q.pop_front());
        let reply = reply.unwrap_or_else(|| {
            let mut v = vec![0u8; buf.len()];
            if request == ControlRequest::SetLnaGain.opcode() && !v.is_empty() {
                v[0] = 1;
            }
            v
        });
        let n = reply.len().min(buf.len());
        buf[..n].copy_from_slice(&reply[..n]);
        self.end();
        Ok(n)
    }

    fn control_out(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        _timeout: Duration,
    ) -> Result<usize, TransferError> {
        self.begin(Transfer {
            direction: Direction::Out,
            request,
            value,
            index,
            data: data.to_vec(),
        })?;
        self.end();
        Ok(data.len())
    }

    fn peripheral_exchange(
        &mut self,
        packet: &[u8; NIOS_PKT_LEN],
    ) -> Result<Vec<u8>, TransferError> {
        let mut inner = self.inner();
        inner.packets.push(*packet);
        if let Some(err) = inner.peripheral_failure.take() {
            return Err(err);
        }
        if let Some(raw) = inner.peripheral_reply.take() {
            return Ok(raw);
        }
        let mut pkt = NiosPacket::unpack(packet).map_err(|_| TransferError::Fault)?;
        let key = (pkt.target.id(), pkt.addr);
        if pkt.write {
            inner.registers.insert(key, pkt.data);
        } else {
            pkt.data = inner.registers.get(&key).copied().unwrap_or(0);
        }
        pkt.success = true;
        Ok(pkt.pack().to_vec())
    }
}
