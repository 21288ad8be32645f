// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Register map and wake-guarded register access.

use std::{thread, time};

use log::{debug, warn};

use crate::error::{Result, SunriseError};
use crate::transport::{BusTransport, Transport};
use crate::wake::Waker;

/// Sunrise bus address, shared by Modbus and I2C
pub const DEFAULT_ADDRESS: u8 = 0x68;

/// Error status, start of the 7 byte measurement block
pub const ERROR_STATUS: u8 = 0x01;
/// Measurement mode, start of the 7 byte configuration block
pub const MEASUREMENT_MODE: u8 = 0x95;
pub const METER_CONTROL: u8 = 0xA5;

/// Meter control bit: ABC disabled when set
pub const METER_CONTROL_ABC_DISABLED: u8 = 0x02;

/// Time the sensor needs to write one EEPROM register
pub const EEPROM_SETTLE_DELAY: time::Duration = time::Duration::from_millis(25);

/// Register reads and writes, each preceded by its own wake handshake.
pub struct RegisterBus<T> {
    transport: BusTransport<T>,
    waker: Waker,
    address: u8,
}

impl<T: Transport> RegisterBus<T> {
    pub fn new(transport: BusTransport<T>, waker: Waker, address: u8) -> Self {
        RegisterBus {
            transport,
            waker,
            address,
        }
    }

    pub fn transport(&self) -> &BusTransport<T> {
        &self.transport
    }

    pub fn into_transport(self) -> BusTransport<T> {
        self.transport
    }

    /// Fill `buf` with the registers starting at `register`.
    ///
    /// A block shorter than `buf` is an error, `buf` must not be used then.
    pub fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<()> {
        self.waker.wake(&mut self.transport, self.address)?;

        let expected = buf.len();
        let actual = self
            .transport
            .request_block(self.address, register, buf, true)
            .map_err(|status| {
                warn!("failed to read register 0x{:02x}: {}", register, status);
                SunriseError::ReadFailed(status)
            })?;
        if actual != expected {
            warn!(
                "failed to read register 0x{:02x}: got {} of {} bytes",
                register, actual, expected
            );
            return Err(SunriseError::ShortRead { expected, actual });
        }
        debug!("read 0x{:02x}: {:02x?}", register, buf);
        Ok(())
    }

    /// Write `bytes` to the registers starting at `register`.
    ///
    /// Always waits [`EEPROM_SETTLE_DELAY`] after the transaction, also
    /// when it failed: the cell write may already be in progress.
    pub fn write_registers(&mut self, register: u8, bytes: &[u8]) -> Result<()> {
        self.waker.wake(&mut self.transport, self.address)?;

        let mut frame = Vec::with_capacity(bytes.len() + 1);
        frame.push(register);
        frame.extend_from_slice(bytes);

        let status = self.transport.write(self.address, &frame);
        thread::sleep(EEPROM_SETTLE_DELAY);

        if !status.is_success() {
            warn!("failed to write register 0x{:02x}: {}", register, status);
            return Err(SunriseError::WriteFailed(status));
        }
        debug!("wrote 0x{:02x}: {:02x?}", register, bytes);
        Ok(())
    }
}
