// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::time::Instant;

use crate::error::Result;
use crate::transport::{BusStatus, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Probe {
        address: u8,
    },
    Write {
        address: u8,
        bytes: Vec<u8>,
        release: bool,
    },
    Read {
        address: u8,
        len: usize,
        release: bool,
    },
    WriteRead {
        address: u8,
        register: u8,
        len: usize,
        release: bool,
    },
    Reinit,
}

/// Register file backed fake bus.
///
/// Reads are served from the register file unless a scripted read is
/// queued. Probes and writes succeed unless a status is queued.
pub struct MockTransport {
    registers: [u8; 256],
    pointer: u8,
    probes: VecDeque<BusStatus>,
    writes: VecDeque<BusStatus>,
    reads: VecDeque<core::result::Result<Vec<u8>, BusStatus>>,
    ops: Vec<(Op, Instant)>,
}

impl MockTransport {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        MockTransport {
            registers: [0u8; 256],
            pointer: 0,
            probes: VecDeque::new(),
            writes: VecDeque::new(),
            reads: VecDeque::new(),
            ops: Vec::new(),
        }
    }

    pub fn set_registers(&mut self, start: u8, bytes: &[u8]) {
        let start = usize::from(start);
        self.registers[start..start + bytes.len()].copy_from_slice(bytes);
    }

    pub fn register(&self, register: u8) -> u8 {
        self.registers[usize::from(register)]
    }

    pub fn queue_probe(&mut self, status: BusStatus) {
        self.probes.push_back(status);
    }

    pub fn queue_write(&mut self, status: BusStatus) {
        self.writes.push_back(status);
    }

    pub fn queue_read(&mut self, bytes: &[u8]) {
        self.reads.push_back(Ok(bytes.to_vec()));
    }

    pub fn queue_read_error(&mut self, status: BusStatus) {
        self.reads.push_back(Err(status));
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.iter().map(|(op, _)| op.clone()).collect()
    }

    pub fn timed_ops(&self) -> &[(Op, Instant)] {
        &self.ops
    }

    pub fn probe_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|(op, _)| matches!(op, Op::Probe { .. }))
            .count()
    }

    /// Ops other than probes and register selects.
    pub fn data_ops(&self) -> Vec<Op> {
        self.ops()
            .into_iter()
            .filter(|op| match op {
                Op::Probe { .. } => false,
                Op::Write { release, .. } => *release,
                _ => true,
            })
            .collect()
    }

    fn record(&mut self, op: Op) {
        self.ops.push((op, Instant::now()));
    }

    fn serve(&mut self, buf: &mut [u8]) -> core::result::Result<usize, BusStatus> {
        match self.reads.pop_front() {
            Some(Ok(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Some(Err(status)) => Err(status),
            None => {
                for byte in buf.iter_mut() {
                    *byte = self.registers[usize::from(self.pointer)];
                    self.pointer = self.pointer.wrapping_add(1);
                }
                Ok(buf.len())
            }
        }
    }
}

impl Transport for MockTransport {
    fn probe(&mut self, address: u8) -> BusStatus {
        self.record(Op::Probe { address });
        self.probes.pop_front().unwrap_or(BusStatus::Success)
    }

    fn write(&mut self, address: u8, bytes: &[u8], release: bool) -> BusStatus {
        self.record(Op::Write {
            address,
            bytes: bytes.to_vec(),
            release,
        });
        let status = self.writes.pop_front().unwrap_or(BusStatus::Success);
        if let Some((&register, data)) = bytes.split_first() {
            self.pointer = register;
            if status.is_success() {
                self.set_registers(register, data);
            }
        }
        status
    }

    fn read(
        &mut self,
        address: u8,
        buf: &mut [u8],
        release: bool,
    ) -> core::result::Result<usize, BusStatus> {
        self.record(Op::Read {
            address,
            len: buf.len(),
            release,
        });
        self.serve(buf)
    }

    fn write_read(
        &mut self,
        address: u8,
        register: u8,
        buf: &mut [u8],
        release: bool,
    ) -> core::result::Result<usize, BusStatus> {
        self.record(Op::WriteRead {
            address,
            register,
            len: buf.len(),
            release,
        });
        self.pointer = register;
        self.serve(buf)
    }

    fn reinit(&mut self) -> Result<()> {
        self.record(Op::Reinit);
        Ok(())
    }
}
