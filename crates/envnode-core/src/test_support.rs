//! Hardware stand-ins shared by the unit tests.

use std::cell::Cell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use crate::sensors::TickSource;
use crate::storage::{BlobStorage, MemoryBlob, StoreError};

/// Scripted I2C bus: every read on an address pops the next queued payload.
#[derive(Default)]
pub struct FakeBus {
    payloads: HashMap<u8, VecDeque<Vec<u8>>>,
    failing: HashSet<u8>,
    failing_reads: HashSet<u8>,
    writes: Vec<(u8, Vec<u8>)>,
}

impl FakeBus {
    pub fn respond(&mut self, address: u8, payload: &[u8]) {
        self.payloads
            .entry(address)
            .or_default()
            .push_back(payload.to_vec());
    }

    /// NACK every transaction addressed to `address`.
    pub fn fail_address(&mut self, address: u8) {
        self.failing.insert(address);
    }

    pub fn fail_reads_from(&mut self, address: u8) {
        self.failing_reads.insert(address);
    }

    pub fn writes_to(&self, address: u8) -> usize {
        self.writes.iter().filter(|(a, _)| *a == address).count()
    }

    pub fn last_write(&self, address: u8) -> Option<Vec<u8>> {
        self.writes
            .iter()
            .rev()
            .find(|(a, _)| *a == address)
            .map(|(_, bytes)| bytes.clone())
    }
}

impl ErrorType for FakeBus {
    type Error = ErrorKind;
}

impl I2c for FakeBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.failing.contains(&address) {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        for op in operations {
            match op {
                Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                Operation::Read(buf) => {
                    if self.failing_reads.contains(&address) {
                        return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
                    }
                    let payload = self
                        .payloads
                        .get_mut(&address)
                        .and_then(VecDeque::pop_front)
                        .ok_or(ErrorKind::Other)?;
                    let len = buf.len().min(payload.len());
                    buf[..len].copy_from_slice(&payload[..len]);
                }
            }
        }
        Ok(())
    }
}

/// Delay that returns immediately and remembers how long it was asked to wait.
#[derive(Default)]
pub struct NoDelay {
    pub total_ms: u32,
    pub total_ns: u64,
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ms += ms;
    }
}

/// Relay output that records its level, optionally refusing to switch.
#[derive(Default)]
pub struct FakePin {
    pub high: bool,
    pub switches: usize,
    pub broken: bool,
}

#[derive(Debug)]
pub struct PinFault;

impl digital::Error for PinFault {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

impl digital::ErrorType for FakePin {
    type Error = PinFault;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), PinFault> {
        if self.broken {
            return Err(PinFault);
        }
        self.high = false;
        self.switches += 1;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), PinFault> {
        if self.broken {
            return Err(PinFault);
        }
        self.high = true;
        self.switches += 1;
        Ok(())
    }
}

pub struct FixedTicks(pub u32);

impl TickSource for FixedTicks {
    fn now_ms(&self) -> u32 {
        self.0
    }
}

/// Blob whose writes fail while the shared `failures` count is above zero.
///
/// Each failed write counts it down, so a test can arm it after handing the
/// blob to a store.
#[derive(Default)]
pub struct FlakyBlob {
    pub inner: MemoryBlob,
    pub failures: Rc<Cell<usize>>,
}

impl BlobStorage for FlakyBlob {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StoreError> {
        self.inner.read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StoreError> {
        let remaining = self.failures.get();
        if remaining > 0 {
            self.failures.set(remaining - 1);
            return Err(StoreError::Backend { operation: "write" });
        }
        self.inner.write(data)
    }
}
